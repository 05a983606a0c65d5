//! Web server command.

use console::style;

use foliacheck::Config;

/// Start the web server, with CLI flags taking precedence over the config.
pub async fn cmd_serve(config: &Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    println!(
        "{} Starting foliacheck server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    foliacheck::server::serve(config, &host, port).await
}
