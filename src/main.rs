use dotenv::dotenv;
use org_mover::org_mover_main;
use std::process::exit;

#[tokio::main]
async fn main() {
    dotenv().ok();
    println!(concat!(
        env!("CARGO_PKG_NAME"),
        " ",
        env!("CARGO_PKG_VERSION")
    ));
    match org_mover_main().await {
        Ok(_) => {
            exit(0);
        }
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };
}
