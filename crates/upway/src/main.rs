mod cli;
mod error;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use upway_config::Broker;
use upway_core::{Bridge, Catalog, LogSink, MqttPublisher, PublishSink};

use crate::cli::{Cli, LogFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, format: LogFormat) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.with_target(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let broker = if cli.dry_run {
        Broker::Optional
    } else {
        Broker::Required
    };
    let settings = upway_config::load(cli.config.as_deref(), broker)?;
    let session = settings.portal.build_session()?;
    let catalog = Catalog::builtin();

    if cli.dry_run {
        info!("dry run: publishes are logged, not sent");
        let bridge = Bridge::new(settings.bridge, session, catalog, LogSink::new());
        serve(&bridge, cli.once).await
    } else {
        let publisher = MqttPublisher::start(&settings.mqtt);
        let bridge = Bridge::new(settings.bridge, session, catalog, publisher);
        serve(&bridge, cli.once).await
    }
}

/// Start the bridge, poll until a shutdown signal (or once), then drain.
///
/// Signal handlers are installed before login so a signal during startup
/// still ends in a drain.
async fn serve<S: PublishSink>(bridge: &Bridge<S>, once: bool) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let signals = ShutdownSignals::install();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        signals.recv().await;
        info!("shutdown requested");
        trigger.cancel();
    });

    if let Err(e) = bridge.start(&cancel).await {
        bridge.sink().shutdown().await;
        return Err(e.into());
    }

    if !once && !cancel.is_cancelled() {
        bridge.run(cancel).await;
    }

    bridge.shutdown().await;
    Ok(())
}

/// Ctrl-C, and SIGTERM on unix. On unix both handlers are registered when
/// this is built, not when it is first awaited.
struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
}

impl ShutdownSignals {
    #[cfg(unix)]
    fn install() -> Self {
        use tokio::signal::unix::{SignalKind, signal};

        let listen = |kind: SignalKind, name: &str| match signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!(error = %e, signal = name, "cannot listen for signal");
                None
            }
        };
        Self {
            interrupt: listen(SignalKind::interrupt(), "SIGINT"),
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    fn install() -> Self {
        Self {}
    }

    #[cfg(unix)]
    async fn recv(mut self) {
        tokio::select! {
            () = wait_for(self.interrupt.as_mut()) => {}
            () = wait_for(self.terminate.as_mut()) => {}
        }
    }

    #[cfg(not(unix))]
    async fn recv(self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(unix)]
async fn wait_for(stream: Option<&mut tokio::signal::unix::Signal>) {
    match stream {
        Some(stream) => {
            stream.recv().await;
        }
        None => std::future::pending().await,
    }
}
