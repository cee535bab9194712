use {
    crate::Config,
    std::{io::IsTerminal, panic::PanicHookInfo},
    time::macros::format_description,
    tracing::Level,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        Registry,
        fmt::{
            MakeWriter,
            time::UtcTime,
            writer::{MakeWriterExt as _, OrElse, WithMaxLevel},
        },
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes tracing setup that is shared between the binaries.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    std::panic::set_hook(Box::new(tracing_panic_hook));
}

fn set_tracing_subscriber(config: &Config) {
    let stderr_threshold = config
        .stderr_threshold
        .into_level()
        .unwrap_or(Level::ERROR);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(route_by_level(
            std::io::stderr,
            std::io::stdout,
            stderr_threshold,
        ))
        .with_timer(UtcTime::new(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        )))
        .with_ansi(std::io::stdout().is_terminal() && std::io::stderr().is_terminal());

    let env_filter = EnvFilter::new(&config.env_filter);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.use_json_format {
        fmt_layer.json().with_filter(env_filter).boxed()
    } else {
        fmt_layer.with_filter(env_filter).boxed()
    };

    tracing_subscriber::registry().with(layer).init();
}

/// Events at `threshold` or more severe go to `severe`, the rest to `other`.
fn route_by_level<S, O>(severe: S, other: O, threshold: Level) -> OrElse<WithMaxLevel<S>, O>
where
    S: for<'a> MakeWriter<'a>,
    O: for<'a> MakeWriter<'a>,
{
    severe.with_max_level(threshold).or_else(other)
}

/// Panic hook that prints roughly the same message as the default panic hook
/// but uses tracing:error instead of stderr.
fn tracing_panic_hook(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}
