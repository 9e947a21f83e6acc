use anyhow::Context;
use chrono::Local;
use clap::{Args as ClapArgs, Parser, Subcommand};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "entry_cli", version)]
struct Args {
    /// Core base URL, e.g. http://127.0.0.1:17600
    #[arg(long, default_value = "http://127.0.0.1:17600")]
    core_url: String,

    /// Request timeout (seconds).
    #[arg(long, default_value_t = 10)]
    timeout_seconds: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the intake catalog the core is configured with.
    Catalog,
    /// List registered participants.
    Participants,
    /// Print the next free participant id.
    NextId,
    /// Register a participant. Without --id the core assigns the next free one.
    AddParticipant {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        age: Option<u8>,
        #[arg(long)]
        sex: Option<String>,
        /// low, medium or high.
        #[arg(long)]
        sensitivity: Option<String>,
        /// Screen time after 21h, e.g. "1-2h".
        #[arg(long)]
        screen_time: Option<String>,
        #[arg(long)]
        sport: Option<bool>,
    },
    /// Delete a participant, optionally with all of their records.
    DeleteParticipant {
        #[arg(long)]
        participant: String,
        #[arg(long, default_value_t = false)]
        with_records: bool,
    },
    /// Log one day for a participant.
    Log(LogArgs),
    /// Delete one day's record.
    DeleteRecord {
        #[arg(long)]
        participant: String,
        #[arg(long)]
        date: String,
    },
    /// Print the participant report (summary, today, patterns).
    Report(RangeArgs),
    /// Print period KPIs and the short-term alert.
    Dashboard(RangeArgs),
    /// List records whose daily total looks implausible.
    Quality {
        #[arg(long)]
        participant: Option<String>,
        #[arg(long)]
        threshold_mg: Option<u32>,
    },
    /// Download records as CSV.
    Export {
        #[arg(long)]
        participant: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
struct RangeArgs {
    #[arg(long)]
    participant: String,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
}

#[derive(ClapArgs, Debug, Default)]
struct LogArgs {
    #[arg(long)]
    participant: String,
    /// YYYY-MM-DD; defaults to today (local time).
    #[arg(long)]
    date: Option<String>,
    /// Repeatable `label=count`, e.g. --item "Espresso (30 ml)=2".
    #[arg(long = "item")]
    items: Vec<String>,
    #[arg(long)]
    last_intake_hour: Option<u8>,
    /// HH:MM
    #[arg(long)]
    bed: Option<String>,
    /// HH:MM
    #[arg(long)]
    wake: Option<String>,
    #[arg(long)]
    sleep_quality: Option<u8>,
    #[arg(long)]
    stress: Option<u8>,
    #[arg(long)]
    anxiety: Option<u8>,
    #[arg(long)]
    focus: Option<u8>,
    #[arg(long, default_value_t = false)]
    palpitations: bool,
    #[arg(long, default_value_t = false)]
    headache: bool,
    #[arg(long, default_value_t = false)]
    irritability: bool,
    #[arg(long, default_value_t = false)]
    digestive: bool,
}

#[derive(Deserialize)]
struct OkResponse<T> {
    ok: bool,
    data: Option<T>,
}

#[derive(Deserialize)]
struct ErrResponse {
    error: String,
}

#[derive(Deserialize)]
struct CatalogItem {
    label: String,
    mg_per_unit: u32,
}

#[derive(Deserialize)]
struct Participant {
    participant_id: String,
    age: u8,
    #[serde(default)]
    sensitivity: Option<String>,
}

#[derive(Deserialize)]
struct Report {
    summary: Vec<String>,
    today: Vec<String>,
    patterns: Vec<String>,
}

#[derive(Deserialize)]
struct LevelCounts {
    low: usize,
    medium: usize,
    high: usize,
}

#[derive(Deserialize)]
struct PeriodSummary {
    entries: usize,
    mean_total_mg: Option<f64>,
    mean_sleep_hours: Option<f64>,
    mean_anxiety: Option<f64>,
    levels: LevelCounts,
}

#[derive(Deserialize)]
struct ShortTermAlert {
    level: String,
    message: String,
}

#[derive(Deserialize)]
struct Dashboard {
    participant_id: String,
    summary: PeriodSummary,
    alert: ShortTermAlert,
}

#[derive(Deserialize)]
struct Outlier {
    key: String,
    total_mg: u32,
    intake_detail: String,
}

#[derive(Deserialize)]
struct DailyRecord {
    date: String,
    total_mg: u32,
    sleep_hours: f64,
}

#[derive(Deserialize)]
struct ParticipantDeleted {
    participant_id: String,
    records_deleted: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entry_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = Client::builder()
        .timeout(Duration::from_secs(args.timeout_seconds))
        .build()?;
    let base = args.core_url.trim_end_matches('/').to_string();
    debug!("core: {base}");

    match args.command {
        Command::Catalog => {
            let items: Vec<CatalogItem> = get_ok(&client, &format!("{base}/catalog")).await?;
            for it in items {
                println!("{:<28} {:>4} mg", it.label, it.mg_per_unit);
            }
        }
        Command::Participants => {
            let list: Vec<Participant> = get_ok(&client, &format!("{base}/participants")).await?;
            if list.is_empty() {
                println!("No participants yet.");
            }
            for p in list {
                println!(
                    "{}  age {}  sensitivity {}",
                    p.participant_id,
                    p.age,
                    p.sensitivity.as_deref().unwrap_or("-")
                );
            }
        }
        Command::NextId => {
            let id: String = get_ok(&client, &format!("{base}/participants/next_id")).await?;
            println!("{id}");
        }
        Command::AddParticipant {
            id,
            age,
            sex,
            sensitivity,
            screen_time,
            sport,
        } => {
            let body = json!({
                "participant_id": id,
                "age": age,
                "sex": sex,
                "sensitivity": sensitivity,
                "screen_time_evening": screen_time,
                "sport": sport,
            });
            let p: Participant = post_ok(&client, &format!("{base}/participants"), &body).await?;
            info!("participant {} registered", p.participant_id);
            println!("{}", p.participant_id);
        }
        Command::DeleteParticipant {
            participant,
            with_records,
        } => {
            let body = json!({ "participant_id": participant, "delete_records": with_records });
            let d: ParticipantDeleted =
                post_ok(&client, &format!("{base}/participants/delete"), &body).await?;
            println!("deleted {} ({} records removed)", d.participant_id, d.records_deleted);
        }
        Command::Log(log) => {
            let date = log
                .date
                .clone()
                .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());
            let body = entry_payload(&log, &date)?;
            let r: DailyRecord = post_ok(&client, &format!("{base}/records"), &body).await?;
            info!("logged {} for {}", r.date, log.participant);
            println!("{}: {} mg, {:.2} h sleep", r.date, r.total_mg, r.sleep_hours);
        }
        Command::DeleteRecord { participant, date } => {
            let body = json!({ "participant_id": participant, "date": date });
            let key: String = post_ok(&client, &format!("{base}/records/delete"), &body).await?;
            println!("deleted {key}");
        }
        Command::Report(range) => {
            let url = participant_url(&base, &range.participant, "report")?;
            let res = client.get(url).query(&range_pairs(&range)).send().await?;
            let report: Report = read_ok(res).await?;
            print!("{}", render_report(&report));
        }
        Command::Dashboard(range) => {
            let url = participant_url(&base, &range.participant, "dashboard")?;
            let res = client.get(url).query(&range_pairs(&range)).send().await?;
            let d: Dashboard = read_ok(res).await?;
            print!("{}", render_dashboard(&d));
        }
        Command::Quality {
            participant,
            threshold_mg,
        } => {
            let mut pairs: Vec<(&str, String)> = Vec::new();
            if let Some(p) = participant {
                pairs.push(("participant_id", p));
            }
            if let Some(t) = threshold_mg {
                pairs.push(("threshold_mg", t.to_string()));
            }
            let res = client.get(format!("{base}/quality")).query(&pairs).send().await?;
            let list: Vec<Outlier> = read_ok(res).await?;
            if list.is_empty() {
                println!("No outliers.");
            }
            for o in list {
                println!("{}  {} mg  {}", o.key, o.total_mg, o.intake_detail);
            }
        }
        Command::Export {
            participant,
            start,
            end,
            out,
        } => {
            let mut pairs: Vec<(&str, String)> = Vec::new();
            for (k, v) in [("participant_id", participant), ("start", start), ("end", end)] {
                if let Some(v) = v {
                    pairs.push((k, v));
                }
            }
            let res = client.get(format!("{base}/export/csv")).query(&pairs).send().await?;
            if !res.status().is_success() {
                anyhow::bail!("http_{}", res.status().as_u16());
            }
            let csv = res.text().await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, csv).with_context(|| format!("write {}", path.display()))?;
                    info!("exported to {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
    }
    Ok(())
}

async fn get_ok<T: DeserializeOwned>(client: &Client, url: &str) -> anyhow::Result<T> {
    let res = client.get(url).send().await?;
    read_ok(res).await
}

async fn post_ok<T: DeserializeOwned>(client: &Client, url: &str, body: &Value) -> anyhow::Result<T> {
    let res = client.post(url).json(body).send().await?;
    read_ok(res).await
}

/// Unwraps the core's `{ok, data}` envelope. Error responses carry a stable code, which is
/// surfaced as the error message.
async fn read_ok<T: DeserializeOwned>(res: reqwest::Response) -> anyhow::Result<T> {
    let status = res.status();
    if !status.is_success() {
        let code = res
            .json::<ErrResponse>()
            .await
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("http_{}", status.as_u16()));
        anyhow::bail!("{code}");
    }
    let body: OkResponse<T> = res.json().await?;
    if !body.ok {
        anyhow::bail!("not_ok");
    }
    body.data.ok_or_else(|| anyhow::anyhow!("missing_data"))
}

/// `"Espresso (30 ml)=2"` → `("Espresso (30 ml)", 2)`. The label may itself contain `=`; the
/// count is whatever follows the last one.
fn parse_item(raw: &str) -> anyhow::Result<(String, u32)> {
    let (label, count) = raw
        .rsplit_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid --item '{raw}'. Expected label=count"))?;
    let label = label.trim();
    if label.is_empty() {
        anyhow::bail!("invalid --item '{raw}': empty label");
    }
    let count: u32 = count
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid --item '{raw}': bad count"))?;
    Ok((label.to_string(), count))
}

fn entry_payload(log: &LogArgs, date: &str) -> anyhow::Result<Value> {
    let mut quantities = Map::new();
    for raw in &log.items {
        let (label, count) = parse_item(raw)?;
        let prev = quantities.get(&label).and_then(Value::as_u64).unwrap_or(0);
        quantities.insert(label, json!(prev + u64::from(count)));
    }
    Ok(json!({
        "participant_id": log.participant,
        "date": date,
        "quantities": quantities,
        "last_intake_hour": log.last_intake_hour,
        "bed_time": log.bed,
        "wake_time": log.wake,
        "sleep_quality": log.sleep_quality,
        "stress": log.stress,
        "anxiety": log.anxiety,
        "focus": log.focus,
        "palpitations": log.palpitations,
        "headache": log.headache,
        "irritability": log.irritability,
        "digestive": log.digestive,
    }))
}

/// `<base>/participants/<id>/<leaf>` with the id percent-encoded as one path segment.
fn participant_url(base: &str, participant: &str, leaf: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("invalid --core-url '{base}'"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("invalid --core-url '{base}': cannot hold a path"))?
        .pop_if_empty()
        .extend(["participants", participant.trim(), leaf]);
    Ok(url)
}

fn range_pairs(range: &RangeArgs) -> Vec<(&'static str, String)> {
    [("start", range.start.as_deref()), ("end", range.end.as_deref())]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v.trim().to_string())))
        .collect()
}

fn render_report(r: &Report) -> String {
    let mut out = String::new();
    out.push_str("Summary\n");
    for line in &r.summary {
        out.push_str(&format!("  {line}\n"));
    }
    if !r.today.is_empty() {
        out.push_str("Today\n");
        for line in &r.today {
            out.push_str(&format!("  - {line}\n"));
        }
    }
    if !r.patterns.is_empty() {
        out.push_str("Patterns\n");
        for line in &r.patterns {
            out.push_str(&format!("  - {line}\n"));
        }
    }
    out
}

fn fmt_mean(v: Option<f64>, unit: &str) -> String {
    match v {
        Some(v) => format!("{v:.1}{unit}"),
        None => "-".to_string(),
    }
}

fn render_dashboard(d: &Dashboard) -> String {
    let s = &d.summary;
    format!(
        "{}: {} entries\n  mean intake {}  mean sleep {}  mean anxiety {}\n  days low/medium/high: {}/{}/{}\n  alert ({}): {}\n",
        d.participant_id,
        s.entries,
        fmt_mean(s.mean_total_mg, " mg"),
        fmt_mean(s.mean_sleep_hours, " h"),
        fmt_mean(s.mean_anxiety, "/10"),
        s.levels.low,
        s.levels.medium,
        s.levels.high,
        d.alert.level,
        d.alert.message,
    )
}
