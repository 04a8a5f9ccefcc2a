//! Inkbit REST API server
//!
//! Run with: cargo run --release --features server --bin inkbit-server

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let mut db_path = String::from("./inkbit_data");
    let mut port: u16 = 3000;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db-path" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = args[i + 1].parse().unwrap_or(3000);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("inkbit-server - blog/CMS content API server\n");
                println!("USAGE:");
                println!("    inkbit-server [OPTIONS]\n");
                println!("OPTIONS:");
                println!("    -d, --db-path <PATH>  Database directory (default: ./inkbit_data)");
                println!("    -p, --port <PORT>     Listen on PORT (default: 3000)");
                println!("    -h, --help            Show this help message");
                return;
            }
            _ => {}
        }
        i += 1;
    }

    if let Err(e) = inkbit::init(&db_path) {
        eprintln!("Failed to initialize database: {}", e);
        std::process::exit(1);
    }
    tracing::info!(%db_path, "database initialized");

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!(
        "inkbit-server v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, inkbit::server::router()).await.unwrap();
}
