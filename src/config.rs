use clap::Parser;

use crate::signaling::DEFAULT_SIGNALING_PORT;

#[derive(Parser, Debug, Clone)]
#[command(name = "roomrelay")]
#[command(version)]
#[command(about = "WebSocket signaling relay for peer-to-peer session setup", long_about = None)]
pub struct Config {
    /// Interface to listen on
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// WebSocket port
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_SIGNALING_PORT)]
    pub port: u16,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
