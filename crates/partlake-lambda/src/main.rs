// AWS Lambda binary entry point
//
// Build with: cargo build -p partlake-lambda --release
// The deployed function is chosen by PARTLAKE_FUNCTION (or `function` in the
// config file).

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    partlake_lambda::run().await
}
