//! CLI command implementations

use crate::output;
use crate::process::{PlaybackEnd, Player, Proxy};
use anyhow::Context;
use ballcast_core::{
    http_client, AvailabilityAggregator, Config, Error, HttpManifestFetcher, RefreshLoop,
    StatsApiCatalog, StreamProber,
};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Options from the command line
pub struct Options {
    pub http: bool,
    pub team: Option<String>,
    pub stream: Option<String>,
}

/// Everything one interactive session needs
struct App {
    refresher: Arc<RefreshLoop>,
    player: Option<Player>,
    team: Option<String>,
    token: CancellationToken,
}

/// Start collaborators, run the prompt loop, then tear everything down
pub async fn run(config: Config, options: Options) -> anyhow::Result<()> {
    let token = CancellationToken::new();
    tokio::spawn(shutdown_signal(token.clone()));

    let prober_config = config.prober_config();
    let client = http_client(&prober_config).context("unable to create HTTP client")?;
    let catalog = StatsApiCatalog::new(client.clone(), &config);

    let mut proxy = None;
    let mut player = None;
    let mut aggregator = None;

    if config.check_streams {
        let mut p = Proxy::locate(&config.proxy)?;
        player = Some(Player::locate(config.proxy.port, options.http)?);
        p.start()?;
        proxy = Some(p);

        let fetcher = HttpManifestFetcher::with_client(client);
        let prober = StreamProber::new(Arc::new(fetcher), prober_config);
        aggregator = Some(AvailabilityAggregator::new(prober));
    }

    let app = App {
        refresher: Arc::new(RefreshLoop::new(
            Arc::new(catalog),
            aggregator,
            config.refresh_interval(),
        )),
        player,
        team: options.team,
        token: token.clone(),
    };

    let result = app.session(options.stream).await;

    token.cancel();
    if let Some(mut proxy) = proxy {
        if let Err(e) = proxy.stop().await {
            warn!(error = %e, "Unable to stop proxy");
        }
    }

    result
}

impl App {
    async fn session(&self, initial_stream: Option<String>) -> anyhow::Result<()> {
        match self.refresher.refresh_once(&self.token).await {
            Ok(_) => {}
            Err(Error::Cancelled) => return Ok(()),
            Err(e) => return Err(e).context("unable to load today's schedule"),
        }

        {
            let refresher = self.refresher.clone();
            let token = self.token.clone();
            tokio::spawn(async move { refresher.run(token).await });
        }

        self.print_scoreboard();

        if let Some(key) = initial_stream {
            self.start_stream(&key).await;
        }

        let mut input = spawn_prompt_reader();

        loop {
            print!(">> ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                _ = self.token.cancelled() => break,
                line = input.recv() => line,
            };

            // stdin closed
            let Some(line) = line else { break };

            match line.trim().to_uppercase().as_str() {
                "Q" => break,
                "" | "R" => self.print_scoreboard(),
                "H" => println!("{}", output::HELP),
                key => self.start_stream(key).await,
            }
        }

        info!("Exiting");
        Ok(())
    }

    fn print_scoreboard(&self) {
        match self.refresher.current() {
            Some(state) => println!(
                "{}",
                output::scoreboard(&state, self.team.as_deref(), self.refresher.checks_streams())
            ),
            None => println!("Schedule not loaded yet."),
        }
    }

    async fn start_stream(&self, key: &str) {
        let Some(player) = &self.player else {
            println!("Stream checking is disabled. Set checkStreams in the configuration file.");
            return;
        };
        let Some(state) = self.refresher.current() else {
            println!("Schedule not loaded yet.");
            return;
        };

        let matches = state.snapshot.find(key);
        let record = match matches.as_slice() {
            [] => {
                println!("Stream doesn't exist.");
                return;
            }
            [record] => *record,
            records => {
                println!("{}", output::stream_chooser(records, &state.schedule));
                return;
            }
        };

        println!("{}", output::starting(record, &state.schedule));

        match player.play(record, &self.token).await {
            Ok(PlaybackEnd::Ended) => println!("\nStream ended"),
            Ok(PlaybackEnd::Exited) | Ok(PlaybackEnd::Cancelled) => {}
            Err(e) => println!("{}", e),
        }
    }
}

/// Read stdin lines on a plain thread so a pending read never holds up
/// runtime shutdown.
fn spawn_prompt_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Cancel `token` on Ctrl-C or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = token.cancelled() => return,
    }

    info!("Shutdown signal received");
    token.cancel();
}
