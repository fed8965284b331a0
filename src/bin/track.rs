//! Interactive coin tracking tool.
//!
//! Prompts for a ticker, lists matching active coins with live price,
//! market cap and volume, and inserts the selected one into the
//! tracked_coins registry that the collector reads each cycle.

use cmc_collector::{
    client::{CmcClient, MarketDataApi},
    config::Config,
    store::{SnapshotStore, SupabaseStore},
    types::TrackedCoin,
};
use serde_json::Value;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// A search hit enriched with live quote data for display
struct Candidate {
    cmc_id: i64,
    name: String,
    symbol: String,
    price: f64,
    market_cap: f64,
    volume_24h: f64,
}

fn format_usd(num: f64) -> String {
    if num >= 1_000_000_000.0 {
        format!("${:.2}B", num / 1_000_000_000.0)
    } else if num >= 1_000_000.0 {
        format!("${:.2}M", num / 1_000_000.0)
    } else if num >= 1.0 {
        format!("${num:.2}")
    } else {
        format!("${num:.8}")
    }
}

fn prompt(text: &str) -> io::Result<String> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn search(client: &CmcClient, ticker: &str) -> Vec<Candidate> {
    let hits = match client.search_coins(ticker).await {
        Ok(hits) => hits,
        Err(e) => {
            eprintln!("Search failed: {e}");
            return Vec::new();
        }
    };

    let ids = hits
        .iter()
        .filter_map(|c| c.get("id").and_then(Value::as_i64))
        .collect::<Vec<_>>();
    let quotes = client.fetch_coin_quotes(&ids).await.unwrap_or_default();

    hits.iter()
        .filter_map(|hit| {
            let cmc_id = hit.get("id").and_then(Value::as_i64)?;
            let usd = quotes
                .iter()
                .find(|q| q.get("id").and_then(Value::as_i64) == Some(cmc_id))
                .and_then(|q| q.pointer("/quote/USD").cloned())
                .unwrap_or(Value::Null);
            Some(Candidate {
                cmc_id,
                name: hit.get("name").and_then(Value::as_str).unwrap_or("").to_string(),
                symbol: hit
                    .get("symbol")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                price: usd.get("price").and_then(Value::as_f64).unwrap_or(0.0),
                market_cap: usd.get("market_cap").and_then(Value::as_f64).unwrap_or(0.0),
                volume_24h: usd.get("volume_24h").and_then(Value::as_f64).unwrap_or(0.0),
            })
        })
        .collect()
}

fn print_table(candidates: &[Candidate]) {
    println!(
        "\n{:<4} {:<20} {:<12} {:<15} {:<15} {:<15} {:<10}",
        "Num", "Name", "Symbol", "Price", "Market Cap", "24h Volume", "CMC ID"
    );
    println!("{}", "-".repeat(95));
    for (i, c) in candidates.iter().enumerate() {
        let name = if c.name.chars().count() > 18 {
            format!("{}..", c.name.chars().take(18).collect::<String>())
        } else {
            c.name.clone()
        };
        println!(
            "{:<4} {:<20} {:<12} {:<15} {:<15} {:<15} {:<10}",
            i + 1,
            name,
            c.symbol,
            format_usd(c.price),
            format_usd(c.market_cap),
            format_usd(c.volume_24h),
            c.cmc_id
        );
    }
}

fn pick(candidates: &[Candidate]) -> io::Result<Option<&Candidate>> {
    if candidates.len() == 1 {
        let c = &candidates[0];
        println!("\nCoin details:");
        println!("  Name:       {}", c.name);
        println!("  Symbol:     {}", c.symbol);
        println!("  CMC ID:     {}", c.cmc_id);
        println!("  Price:      {}", format_usd(c.price));
        println!("  Market Cap: {}", format_usd(c.market_cap));
        println!("  24h Volume: {}", format_usd(c.volume_24h));
        let answer = prompt("Add to tracking? (y/n): ")?;
        return Ok((answer.eq_ignore_ascii_case("y")).then_some(c));
    }

    print_table(candidates);
    loop {
        let answer = prompt("\nEnter number of coin to track (0 to skip): ")?;
        match answer.parse::<usize>() {
            Ok(0) => return Ok(None),
            Ok(n) if n <= candidates.len() => return Ok(Some(&candidates[n - 1])),
            _ => println!("Invalid choice, try again"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let client = CmcClient::new(&config.cmc_base_url, &config.cmc_api_key)?;
    let store = SupabaseStore::new(&config.supabase_url, &config.supabase_key)?;

    loop {
        let ticker = prompt("\nEnter coin ticker (or 'q' to quit): ")?;
        if ticker.eq_ignore_ascii_case("q") {
            break;
        }
        if ticker.is_empty() {
            continue;
        }

        println!("\nSearching for {ticker}...");
        let candidates = search(&client, &ticker).await;
        if candidates.is_empty() {
            println!("No active coins found matching '{ticker}'");
            continue;
        }

        if let Some(choice) = pick(&candidates)? {
            let coin = TrackedCoin {
                cmc_id: choice.cmc_id,
                symbol: choice.symbol.clone(),
                name: choice.name.clone(),
            };
            match store.add_tracked_coin(&coin).await {
                Ok(()) => println!("\nSuccessfully added {} to tracking!", coin.name),
                Err(e) => println!("\nFailed to add coin to tracking: {e}"),
            }
        }
    }

    println!("\nGoodbye!");
    Ok(())
}
