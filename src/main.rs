#[tokio::main]
async fn main() {
    bracket_pickem_lib::run().await;
}
