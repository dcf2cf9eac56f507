//! cert-forge – HTTP service for certificate and attendance report PDFs.
//!
//! Usage:
//!   cert-forge [--host 127.0.0.1] [--port 8000] [--templates templates]
//!
//! Endpoints:
//!   POST /generate-certificate   → certificate.pdf
//!   POST /generate-report        → report_<event title>.pdf
//!   GET  /health

use std::{env, process, sync::Arc};

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::info;

use cert_forge::config::{parse_args, usage, Command};
use cert_forge::{configure_routes, AppState, ForgeRenderer, TemplateStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let prog = env::args().next().unwrap_or_else(|| "cert-forge".to_string());
    let config = match parse_args(env::args().skip(1)) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            eprintln!("{}", usage(&prog));
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{}", usage(&prog));
            process::exit(1);
        }
    };

    let templates = match TemplateStore::from_dir(&config.templates_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error loading templates: {e}");
            process::exit(1);
        }
    };
    let state = web::Data::new(AppState::new(
        templates,
        Arc::new(ForgeRenderer::default()),
    ));

    info!(
        "Server running at http://{}:{} (templates: {})",
        config.host,
        config.port,
        config.templates_dir.display()
    );

    let payload_limit = config.payload_limit;
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::PayloadConfig::new(payload_limit))
            .app_data(state.clone())
            .configure(configure_routes)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }
    server.bind((config.host.as_str(), config.port))?.run().await
}
