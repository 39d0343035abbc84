use std::{fs::OpenOptions, io, sync::Arc};

use actix_web::{web, App, HttpServer};
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::{
    auth::CallbackToken,
    mock::MockSource,
    store::Store,
    upstream::N8nClient,
    workdays::WorkingDayCalculator,
};

mod config;
mod consts;
mod error;
mod workdays;

mod auth;
mod mock;
mod model;
mod pages;
mod revalidate;
mod store;
mod upstream;

#[cfg(test)]
mod test_support;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("trace.log")?;

    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_line_number(true)
                .with_filter(EnvFilter::from_default_env())
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(log_file)
                .with_filter(filter::LevelFilter::from_level(Level::TRACE))
        );

    tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)?;

    let config::Config {
        host_address,
        time_zone,
        weekend,
        holidays,
        n8n,
        callback_token,
        revalidate_interval,
        mock_dir,
        store_path,
    } = config::load().map_err(io::Error::other)?;

    let store = Arc::new(match store_path {
        Some(path) => Store::open(path).map_err(io::Error::other)?,
        None => Store::in_memory(),
    });

    let n8n_client = N8nClient::new(&n8n).map_err(io::Error::other)?;

    let mock = match mock_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Mock mode enabled, n8n will not be contacted");
            MockSource::from_dir(dir)
        }
        None => MockSource::disabled(),
    };

    let subscription = (n8n_client.has_snapshot() && !mock.is_enabled()).then(|| {
        let client = n8n_client.clone();
        revalidate::subscribe(store.clone(), revalidate_interval, consts::REVALIDATE_RETRIES, move || {
            let client = client.clone();
            async move { client.snapshot().await }
        })
    });

    info!(
        %host_address,
        time_zone = time_zone.name(),
        weekend = ?weekend.indices(),
        holidays = holidays.len(),
        "Starting e-leave"
    );

    let calculator = web::Data::new(WorkingDayCalculator::new(time_zone, weekend, holidays));
    let store = web::Data::from(store);
    let n8n_client = web::Data::new(n8n_client);
    let mock = web::Data::new(mock);
    let callback_token = web::Data::new(CallbackToken(callback_token));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(calculator.clone())
            .app_data(store.clone())
            .app_data(n8n_client.clone())
            .app_data(mock.clone())
            .app_data(callback_token.clone())
            .wrap(TracingLogger::default())
            .configure(pages::config)
    });

    server
        .bind(host_address)?
        .run().await?;

    if let Some(subscription) = subscription {
        subscription.shutdown().await;
    }

    Ok(())
}
