mod cli;
mod demo;
mod routes;
mod server;

use propsync::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
