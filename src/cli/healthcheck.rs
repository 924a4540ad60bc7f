use crate::cli::Args;

pub fn run(args: Args, fallback_bind: String) {
    println!("Running health check...");
    let bind = args.check_bind.unwrap_or(fallback_bind);
    let endpoint = format!("http://{bind}/api/healthcheck");
    println!("Health check endpoint: {endpoint}");
    match minreq::get(endpoint).with_timeout(1).send() {
        Ok(resp) if resp.status_code == 200 => println!("Health check passed"),
        Ok(resp) => {
            eprintln!("Health check failed with status: {}", resp.status_code);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Health check failed: {e}");
            std::process::exit(1);
        }
    }
}
