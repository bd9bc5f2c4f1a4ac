// web-server/src/bin/mock_init_data.rs
//! Print a signed init-data string for local testing against the server.

use chrono::Utc;
use clap::Parser;
use questline_common::{FieldSet, InitDataVerifier};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "mock-init-data", about = "Generate signed mini app init data")]
struct Args {
    /// Bot token the server is configured with
    #[arg(long, env = "BOT_TOKEN")]
    bot_token: String,

    #[arg(long, default_value_t = 99281932)]
    user_id: i64,

    #[arg(long, default_value = "Andrew")]
    first_name: String,

    #[arg(long, default_value = "Rogue")]
    last_name: String,

    #[arg(long, default_value = "rogue")]
    username: String,

    #[arg(long, default_value = "en")]
    language_code: String,

    #[arg(long)]
    premium: bool,

    /// Unix timestamp; defaults to now
    #[arg(long)]
    auth_date: Option<i64>,

    /// Print the request body for POST /api/users instead of the raw string
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let mut fields = FieldSet::new();
    fields.insert(
        "user",
        json!({
            "id": args.user_id,
            "first_name": args.first_name,
            "last_name": args.last_name,
            "username": args.username,
            "language_code": args.language_code,
            "is_premium": args.premium,
            "allows_write_to_pm": true,
        })
        .to_string(),
    );
    fields.insert(
        "auth_date",
        args.auth_date.unwrap_or_else(|| Utc::now().timestamp()).to_string(),
    );
    fields.insert("chat_type", "sender");
    fields.insert("start_param", "debug");

    InitDataVerifier::new(&args.bot_token).sign(&mut fields);
    let raw = fields.to_raw();

    if args.json {
        println!("{}", json!({ "initDataRaw": raw }));
    } else {
        println!("{}", raw);
    }
}
