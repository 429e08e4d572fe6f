#[tokio::main]
async fn main() {
    crm_backend::run().await;
}
