use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use mental_poker::config::ProtocolConfig;
use mental_poker::protocol::{Seat, Table};
use mental_poker::wire::WireMessage;
use mental_poker::DECK_SIZE;

const LOG_TARGET: &str = "bin::deal_demo";

#[derive(Debug, Parser)]
#[command(name = "deal_demo")]
#[command(about = "Shuffle and deal a full deck between two in-process players", long_about = None)]
struct Args {
    /// Bit length of each shared prime [default: config file, else 128]
    #[arg(long, env = "DEAL_PRIME_BITS")]
    prime_bits: Option<usize>,

    /// Generate safe primes (p = 2p' + 1)
    #[arg(long, env = "DEAL_SAFE_PRIMES", default_value_t = false)]
    safe_primes: bool,

    /// Optional RNG seed for a reproducible deal
    #[arg(long, env = "DEAL_RNG_SEED")]
    seed: Option<u64>,

    /// Deal this many slots privately to each player before the shared draws
    #[arg(long, default_value_t = 2)]
    hole_cards: usize,

    /// Optional JSON file with protocol settings; flags above override it
    #[arg(long, env = "DEAL_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "DEAL_LOG_JSON", default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json)?;

    let config = build_config(&args)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(
        target: LOG_TARGET,
        prime_bits = config.prime_bits,
        safe_primes = config.safe_primes,
        seeded = args.seed.is_some(),
        "generating shared primes"
    );
    let mut table = Table::generate(&mut rng, config).context("failed to set up the table")?;
    table.deal(&mut rng).context("shuffle failed")?;

    if let Some(deck) = table.player(Seat::First).deck() {
        let frame = deck.to_frame().context("failed to frame the final deck")?;
        debug!(target: LOG_TARGET, bytes = frame.len(), "final deck framed");
    }

    let hole = args.hole_cards.min(DECK_SIZE / 2);
    let mut slot = 0;
    for seat in [Seat::First, Seat::Second] {
        for _ in 0..hole {
            let card = table
                .draw_for(slot, seat)
                .with_context(|| format!("private draw of slot {slot} failed"))?;
            info!(target: LOG_TARGET, slot, %seat, %card, "dealt privately");
            slot += 1;
        }
    }
    for slot in slot..DECK_SIZE {
        let card = table
            .draw(slot)
            .with_context(|| format!("draw of slot {slot} failed"))?;
        info!(target: LOG_TARGET, slot, %card, "dealt face up");
    }

    info!(target: LOG_TARGET, "all {DECK_SIZE} slots drawn");
    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<ProtocolConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ProtocolConfig::from_json_str(&raw).context("invalid config file")?
        }
        None => ProtocolConfig::default(),
    };
    if let Some(bits) = args.prime_bits {
        config.prime_bits = bits;
    }
    config.safe_primes = config.safe_primes || args.safe_primes;
    config.validate().context("invalid protocol settings")?;
    Ok(config)
}
