use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use log::{debug, info};
use serde_json::Value;
use tabled::builder::Builder;
use tabled::{Table, Tabled};

use boum::endpoint::Resource;
use boum::models::TIMESTAMP_FORMAT;
use boum::{
    ApiClient, ClientConfig, Credentials, DataQuery, Device, DeviceDataModel, DeviceStateModel,
    PumpState, API_URL_PROD,
};

#[derive(Parser)]
#[command(name = "boum")]
#[command(about = "A CLI for controlling boum irrigation and aquaponics boxes")]
#[command(version)]
struct Cli {
    /// Email address of your boum account
    #[arg(long, env = "BOUM_EMAIL")]
    email: Option<String>,

    /// Password of your boum account (prompted for when omitted)
    #[arg(long, env = "BOUM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Refresh token, e.g. one printed by `boum token`
    #[arg(long, env = "BOUM_API_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    /// Base URL of the boum API
    #[arg(long, env = "BOUM_API_BASE_URL", default_value = API_URL_PROD)]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all devices of the account
    Devices,
    /// Register a new device
    Create,
    /// Show the desired and reported state of a device
    Show {
        /// Device id
        device_id: String,
    },
    /// Change the desired state of a device
    Set {
        /// Device id
        device_id: String,
        /// Pump state: on or off
        #[arg(long)]
        pump: Option<PumpState>,
        /// Time of day to refill, as HH:MM
        #[arg(long, value_parser = parse_refill_time)]
        refill_time: Option<NaiveTime>,
        /// Days between refills
        #[arg(long)]
        refill_interval_days: Option<i64>,
        /// Maximum pump run time in minutes (1-1439)
        #[arg(long)]
        max_pump_duration: Option<i64>,
    },
    /// Claim a device for yourself or for another user
    Claim {
        /// Device id
        device_id: String,
        /// Claim the device for this user id
        #[arg(long)]
        user: Option<String>,
    },
    /// Release your claim on a device
    Unclaim {
        /// Device id
        device_id: String,
    },
    /// Show telemetry data of a device
    Data {
        /// Device id
        device_id: String,
        /// Earliest timestamp, e.g. 2024-05-01T00:00:00Z
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Latest timestamp, e.g. 2024-05-02T00:00:00Z
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// Aggregation interval in minutes
        #[arg(long)]
        interval: Option<i64>,
        /// Print the data as JSON columns instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show details of the signed-in user or of a given user
    User {
        /// User id
        user_id: Option<String>,
    },
    /// Sign in and print a refresh token for use with --refresh-token
    Token,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Device ID")]
    id: String,
}

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Desired")]
    desired: String,
    #[tabled(rename = "Reported")]
    reported: String,
}

fn parse_refill_time(value: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| format!("'{}' is not a time of day in HH:MM format", value))
}

fn credentials(cli: &Cli) -> Result<Credentials> {
    let mut credentials = match (&cli.email, &cli.password) {
        (Some(email), Some(password)) => Credentials::password(email, password),
        (Some(email), None) if cli.refresh_token.is_none() => {
            let password = rpassword::prompt_password(format!("Password for {}: ", email))
                .context("Failed to read password")?;
            Credentials::password(email, password)
        }
        _ => Credentials::default(),
    };
    if let Some(refresh_token) = &cli.refresh_token {
        credentials = credentials.with_refresh_token(refresh_token);
    }

    if credentials.validate().is_err() {
        bail!(
            "No credentials. Provide --email and --password (BOUM_EMAIL, BOUM_PASSWORD) \
             or --refresh-token (BOUM_API_REFRESH_TOKEN)."
        );
    }
    Ok(credentials)
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = ClientConfig::new(credentials(&cli)?).with_base_url(&cli.base_url);
    let client = ApiClient::from_config(config)?;

    info!("Connecting to boum...");
    let active = client.enter().context("Failed to sign in")?;
    debug!("Signed in");

    match cli.command {
        Commands::Devices => {
            let ids = Device::device_ids(&active)?;
            if ids.is_empty() {
                println!("No devices found for this account.");
                return Ok(());
            }
            let rows: Vec<DeviceRow> = ids.into_iter().map(|id| DeviceRow { id }).collect();
            println!("{}", Table::new(&rows));
        }
        Commands::Create => {
            let device = Device::create(&active)?;
            println!("Created device {}.", device.device_id);
        }
        Commands::Show { device_id } => {
            let (desired, reported) = Device::new(&device_id, &active).device_states()?;
            println!("{}", Table::new(state_rows(desired, reported)));
        }
        Commands::Set {
            device_id,
            pump,
            refill_time,
            refill_interval_days,
            max_pump_duration,
        } => {
            let mut builder = DeviceStateModel::builder();
            if let Some(pump) = pump {
                builder = builder.pump_state(pump);
            }
            if let Some(time) = refill_time {
                builder = builder.refill_time(time);
            }
            if let Some(days) = refill_interval_days {
                builder = builder.refill_interval_days(days);
            }
            if let Some(minutes) = max_pump_duration {
                builder = builder.max_pump_duration_minutes(minutes);
            }
            let state = builder.build()?;
            if state.is_empty() {
                bail!(
                    "Nothing to set. Pass at least one of --pump, --refill-time, \
                     --refill-interval-days or --max-pump-duration."
                );
            }

            Device::new(&device_id, &active).set_desired_device_state(state)?;
            println!("Desired state of device {} updated.", device_id);
        }
        Commands::Claim { device_id, user } => {
            Device::new(&device_id, &active).claim(user.as_deref())?;
            match user {
                Some(user) => println!("Device {} claimed for user {}.", device_id, user),
                None => println!("Device {} claimed.", device_id),
            }
        }
        Commands::Unclaim { device_id } => {
            Device::new(&device_id, &active).unclaim()?;
            println!("Device {} unclaimed.", device_id);
        }
        Commands::Data {
            device_id,
            start,
            end,
            interval,
            json,
        } => {
            let mut query = DataQuery::new();
            if let Some(start) = start {
                query = query.start(start);
            }
            if let Some(end) = end {
                query = query.end(end);
            }
            if let Some(minutes) = interval {
                query = query.interval(Duration::minutes(minutes));
            }

            let data = Device::new(&device_id, &active).telemetry_data(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else if data.is_empty() {
                println!("No data found for device {}.", device_id);
            } else {
                println!("{}", data_table(&data));
            }
        }
        Commands::User { user_id } => {
            let users = active.root().users();
            let user = match user_id {
                Some(user_id) => users.with_id(user_id).get()?,
                None => users.get()?,
            };
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Commands::Token => {
            let refresh_token = active
                .session()
                .refresh_token()
                .ok_or_else(|| anyhow!("The API did not return a refresh token"))?;
            println!("{}", refresh_token);
        }
    }

    Ok(())
}

fn state_rows(
    desired: Option<DeviceStateModel>,
    reported: Option<DeviceStateModel>,
) -> Vec<StateRow> {
    let desired = desired.unwrap_or_default();
    let reported = reported.unwrap_or_default();
    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    vec![
        StateRow {
            field: "Pump state",
            desired: show(desired.pump_state().map(|s| s.to_string())),
            reported: show(reported.pump_state().map(|s| s.to_string())),
        },
        StateRow {
            field: "Refill time",
            desired: show(desired.refill_time().map(|t| t.format("%H:%M").to_string())),
            reported: show(reported.refill_time().map(|t| t.format("%H:%M").to_string())),
        },
        StateRow {
            field: "Refill interval (days)",
            desired: show(desired.refill_interval_days().map(|d| d.to_string())),
            reported: show(reported.refill_interval_days().map(|d| d.to_string())),
        },
        StateRow {
            field: "Max pump duration (min)",
            desired: show(desired.max_pump_duration_minutes().map(|m| m.to_string())),
            reported: show(reported.max_pump_duration_minutes().map(|m| m.to_string())),
        },
    ]
}

fn data_table(data: &DeviceDataModel) -> Table {
    let mut builder = Builder::default();

    let mut header = vec!["Timestamp".to_string()];
    header.extend(data.metrics.keys().cloned());
    builder.push_record(header);

    for (row, timestamp) in data.timestamps.iter().enumerate() {
        let mut record = vec![timestamp.format(TIMESTAMP_FORMAT).to_string()];
        record.extend(data.metrics.values().map(|column| cell(column.get(row))));
        builder.push_record(record);
    }

    builder.build()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
