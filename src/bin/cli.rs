use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    showroom::cli::run().await
}
