use std::net::SocketAddr;

use axum::Router;
use tower_http::services::ServeDir;

use crate::PreviewArgs;

pub async fn run(args: &PreviewArgs) -> Result<(), anyhow::Error> {
    let out_dir = args.work_dir.join("public");
    if !out_dir.is_dir() {
        anyhow::bail!(
            "no generated site at {}; run \"tablog generate {}\" first",
            out_dir.display(),
            args.work_dir.display()
        );
    }

    let serve_dir = ServeDir::new(&out_dir).append_index_html_on_directories(true);
    let app = Router::new().fallback_service(serve_dir);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    let display_host = if args.bind == "0.0.0.0" {
        "localhost"
    } else {
        &args.bind
    };
    let url = format!("http://{}:{}", display_host, args.port);

    println!("Serving {} at {}", out_dir.display(), url);
    println!("Press Ctrl+C to stop");

    if args.open
        && let Err(e) = open::that(&url)
    {
        eprintln!("Failed to open browser: {}", e);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
