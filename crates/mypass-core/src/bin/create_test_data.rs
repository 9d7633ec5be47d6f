use mypass_core::{CredentialKind, NewCredential};
use std::fs::File;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "test_passwords.json".to_string());

    let mut records = Vec::new();

    // A few servers sharing a host, so search has something to narrow down
    for (offset, n) in (1..=4).enumerate() {
        records.push(NewCredential {
            title: format!("FTP {}", n),
            username: Some("uer".to_string()),
            password: "123456".to_string(),
            link: Some("12.240.11.55".to_string()),
            port: Some("21".to_string()),
            ..NewCredential::new(CredentialKind::Ftp)
        }
        .into_record(110 + offset as i64));
    }

    records.push(NewCredential {
        title: "Build box".to_string(),
        username: Some("root".to_string()),
        password: "hunter22".to_string(),
        link: Some("build.internal".to_string()),
        port: Some("22".to_string()),
        ..NewCredential::new(CredentialKind::Ssh)
    }
    .into_record(120));

    records.push(NewCredential {
        title: "Mail".to_string(),
        username: Some("me@example.com".to_string()),
        password: "correct horse".to_string(),
        link: Some("mail.example.com".to_string()),
        two_factor_enabled: true,
        ..NewCredential::new(CredentialKind::LoginPassword)
    }
    .into_record(121));

    records.push(NewCredential {
        title: "Wifi".to_string(),
        password: "guest-network".to_string(),
        ..NewCredential::new(CredentialKind::PasswordOnly)
    }
    .into_record(122));

    records.push(NewCredential {
        title: "Orders DB".to_string(),
        username: Some("app".to_string()),
        password: "s3cret".to_string(),
        link: Some("db.internal".to_string()),
        database_name: Some("orders".to_string()),
        ..NewCredential::new(CredentialKind::Database)
    }
    .into_record(123));

    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, &records)?;

    println!("Created {} with {} records; load it with `mypass import {}`", path, records.len(), path);
    Ok(())
}
