use seamless_wallet::{WalletClient, WalletError, fetch_config};

#[tokio::main]
async fn main() -> Result<(), WalletError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let config = fetch_config()?;
    let player = std::env::args()
        .nth(1)
        .ok_or_else(|| WalletError::Config("usage: seamless-wallet <player-id>".to_string()))?;

    let mut client = WalletClient::new(config)?;
    client.for_player(player);
    client.create_wallet().await?;

    let balance = client.get_balance(true).await?;
    let sum = client.get_sum_of_wallet_balances().await?;

    println!("balance: {balance}");
    println!("sum of wallet balances: {sum}");

    Ok(())
}
