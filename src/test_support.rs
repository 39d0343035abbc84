use actix_web::{web, App, HttpServer};

/// Serves `routes` on a loopback port in the background, standing in for n8n.
/// Returns the base url, e.g. `http://127.0.0.1:41234`.
pub(crate) fn spawn_upstream<F>(routes: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(routes.clone()))
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("Unable to bind upstream test server");

    let address = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    format!("http://{address}")
}
