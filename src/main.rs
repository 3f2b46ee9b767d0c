use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() > 1 && (args[1] == "--version" || args[1] == "-V") {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(err) = picshelf_lib::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
