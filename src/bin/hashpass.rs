use sha2::{Digest, Sha256};

fn main() {
    let Some(password) = std::env::args().nth(1) else {
        eprintln!("Usage: hashpass <password>");
        std::process::exit(2);
    };
    let digest = Sha256::digest(password.as_bytes());
    println!("{}", hex::encode(digest));
}
