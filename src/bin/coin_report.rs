use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use coinlens::cache::{DurableStore, MemoryStore, RedisStore, TtlCache};
use coinlens::client::{GeminiClient, HttpFetcher, MarketDataClient, generated_text};
use coinlens::config::Config;
use coinlens::session::{CoinReport, Session, SessionConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 通过代理网关对比最多 3 个币种
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 币种 id，例如 bitcoin ethereum
    #[arg(required = true, num_args = 1..=3)]
    coins: Vec<String>,

    /// 代理网关地址，默认取 PROXY_BASE_URL
    #[arg(long)]
    proxy: Option<String>,

    /// 报告生成后附加一个问题给生成式接口
    #[arg(long)]
    ask: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    let proxy = args.proxy.unwrap_or(config.proxy_base_url.clone());

    let durable: Arc<dyn DurableStore> = match config.redis_url.as_deref().map(RedisStore::open) {
        Some(Ok(store)) => Arc::new(store),
        Some(Err(e)) => {
            tracing::warn!("redis unavailable, caching in memory only: {}", e);
            Arc::new(MemoryStore::new())
        }
        None => Arc::new(MemoryStore::new()),
    };

    let fetcher = Arc::new(HttpFetcher::new(&proxy));
    let market = MarketDataClient::new(fetcher.clone(), TtlCache::two_tier(durable));
    let session = Session::new(market, SessionConfig::default());

    for coin in &args.coins {
        if !session.select(coin).await {
            tracing::warn!("skipping {}", coin);
        }
    }

    let Some(report) = session.build_report().await else {
        eprintln!("nothing selected");
        return ExitCode::FAILURE;
    };

    println!(
        "{:<12} {:>8} {:>16} {:>18} {:>18} {:>10}",
        "coin", "symbol", "price (usd)", "market cap (usd)", "volume (usd)", "365d"
    );
    for coin in &report.coins {
        print_row(coin);
    }

    if let Some(question) = args.ask {
        let summary = serde_json::to_string(&report.coins).unwrap_or_default();
        let prompt = format!("{}\n\nMarket data (USD):\n{}", question, summary);
        match GeminiClient::new(fetcher).call_gemini_proxy(&prompt).await {
            Ok(response) => match generated_text(&response) {
                Some(text) => println!("\n{}", text),
                None => eprintln!("generative response had no text"),
            },
            Err(e) => {
                eprintln!("generative request failed: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    if report.status.reverts() {
        eprintln!("report incomplete: {:?}", report.status);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn print_row(coin: &CoinReport) {
    let money = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into());
    let change = coin
        .change_pct
        .map(|v| format!("{:+.2}%", v))
        .unwrap_or_else(|| "-".into());
    println!(
        "{:<12} {:>8} {:>16} {:>18} {:>18} {:>10}",
        coin.name,
        coin.symbol,
        money(coin.price_usd),
        money(coin.market_cap_usd),
        money(coin.volume_usd),
        change
    );
}
