use negocia::cli::{is_internal, run};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("NEGOCIA_LOG", "warn")).init();
    let _ = enable_ansi_support::enable_ansi_support();

    if let Err(e) = run() {
        if is_internal(&e) {
            eprintln!("Internal error: {}", e);
            let mut causes = e.chain().skip(1).peekable();
            if causes.peek().is_some() {
                eprintln!("\nCaused by:");
                for (indent, cause) in causes.enumerate() {
                    eprintln!("{:indent$}  {}", "", cause, indent = indent + 1);
                }
            }
            std::process::exit(2);
        } else {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
