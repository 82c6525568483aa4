mod proxy;
mod server;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "popkit-server",
    about = "Popkit proxy server forwarding form submissions to the CMS"
)]
struct Cli {
    #[command(flatten)]
    server: server::ServerArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    server::run(cli.server).await;
}
