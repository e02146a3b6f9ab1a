use std::io;
use std::path::PathBuf;

use chrono::{Local, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studytrack::config::Config;
use studytrack::store::Library;
use studytrack::{drill, progress, review, web};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studytrack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: studytrack <command> [-d DATA_DIR] [-p PORT]");
        eprintln!("Commands:");
        eprintln!("  status     Show due, urgent and mastered topics");
        eprintln!("  review     Review due topics in the terminal");
        eprintln!("  serve      Start the web UI");
        std::process::exit(1);
    }

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    apply_flags(&mut config, &args[2..]);

    let library = match Library::open(&config.data_dir) {
        Ok(lib) => lib,
        Err(e) => {
            eprintln!("Error loading {}: {e}", config.data_dir.display());
            std::process::exit(1);
        }
    };

    let result = match args[1].as_str() {
        "status" => {
            status(&library);
            Ok(())
        }
        "review" => drill(library),
        "serve" => match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(web::serve(library, &config.bind_addr())),
            Err(e) => Err(e.into()),
        },
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            eprintln!("Commands: status, review, serve");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn apply_flags(config: &mut Config, args: &[String]) {
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-d" if i + 1 < args.len() => {
                config.data_dir = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            "-p" if i + 1 < args.len() => {
                config.port = args[i + 1].parse().unwrap_or_else(|_| {
                    eprintln!("Invalid port: {}", args[i + 1]);
                    std::process::exit(1);
                });
                i += 2;
            }
            other => {
                eprintln!("Unknown option: {other}");
                std::process::exit(1);
            }
        }
    }
}

fn status(library: &Library) {
    let now = Local::now();
    let summary = progress::dashboard_summary(library, &now);

    println!(
        "{} topics, {}% complete, {} mastered",
        summary.total_topics, summary.overall_progress, summary.mastered
    );
    println!(
        "{} due today, {} urgent",
        summary.due_today, summary.urgent
    );
    println!();

    for s in review::subject_summaries(library, now.with_timezone(&Utc)) {
        println!(
            "  {}: {} due / {} upcoming / {} mastered ({} topics)",
            s.name, s.due, s.upcoming, s.mastered, s.total
        );
    }
}

fn drill(mut library: Library) -> studytrack::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    drill::run(&mut library, stdin.lock(), stdout.lock(), Utc::now)?;
    Ok(())
}
