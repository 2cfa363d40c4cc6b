use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::database::models::Contact;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let (Some(Value::Object(extra)), Some(target)) = (data, response.as_object_mut()) {
                target.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

pub fn output_value<T: Serialize>(
    output_format: &OutputFormat,
    value: &T,
    text: impl FnOnce(&T),
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}

pub fn output_contacts(
    output_format: &OutputFormat,
    contacts: &[Contact],
    empty_message: &str,
) -> anyhow::Result<()> {
    output_value(output_format, &contacts, |contacts| {
        if contacts.is_empty() {
            println!("{}", empty_message);
            return;
        }
        for contact in contacts.iter() {
            println!("{}", contact_line(contact));
        }
    })
}

pub fn output_contact(output_format: &OutputFormat, contact: &Contact) -> anyhow::Result<()> {
    output_value(output_format, contact, |contact| {
        println!("ID:       {}", contact.id);
        println!("Name:     {} {}", contact.name, contact.surname);
        println!("Email:    {}", contact.email);
        println!("Phone:    {}", contact.phone);
        println!("Birthday: {}", contact.birthday);
        if let Some(notes) = &contact.notes {
            println!("Notes:    {}", notes);
        }
    })
}

pub fn contact_line(contact: &Contact) -> String {
    format!(
        "{:>5}  {} {}  <{}>  {}  {}",
        contact.id, contact.name, contact.surname, contact.email, contact.phone, contact.birthday
    )
}

/// Read one line from stdin after printing `label`
pub fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}

pub fn resolve_password(password: Option<String>) -> anyhow::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => prompt("Password"),
    }
}
