use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::ser::{Serialize, SerializeMap, Serializer};
use vscp_codec::ParameterMap;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Serializes as a JSON object in wire order.
struct OrderedParams<'a>(&'a ParameterMap);

impl Serialize for OrderedParams<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(serde::Serialize)]
struct OperationOutput<'a> {
    operation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    status: &'static str,
    params: OrderedParams<'a>,
}

/// Print the parameters a successful operation returned.
pub fn print_params(operation: &str, uid: Option<&str>, params: &ParameterMap, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = OperationOutput {
                operation,
                id: uid,
                status: "ok",
                params: OrderedParams(params),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            for (key, value) in params.iter() {
                table.add_row(vec![key, value]);
            }
            match uid {
                Some(uid) => println!("{operation} {uid}: ok"),
                None => println!("{operation}: ok"),
            }
            if !params.is_empty() {
                println!("{table}");
            }
        }
        OutputFormat::Pretty => {
            let mut line = match uid {
                Some(uid) => format!("{operation} id={uid} status=ok"),
                None => format!("{operation} status=ok"),
            };
            for (key, value) in params.iter() {
                line.push_str(&format!(" {key}={value}"));
            }
            println!("{line}");
        }
        OutputFormat::Raw => {
            let body: Vec<String> = params
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            println!("?{}", body.join("&"));
        }
    }
}

#[derive(serde::Serialize)]
pub struct ServeReport {
    pub socket: String,
    pub sensors: usize,
    pub connections: usize,
    pub requests: usize,
    pub rejected: usize,
}

/// Print what an emulator session handled before shutting down.
pub fn print_serve_report(report: &ServeReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SOCKET", "SENSORS", "CONNECTIONS", "REQUESTS", "REJECTED"])
                .add_row(vec![
                    report.socket.clone(),
                    report.sensors.to_string(),
                    report.connections.to_string(),
                    report.requests.to_string(),
                    report.rejected.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "socket={} sensors={} connections={} requests={} rejected={}",
                report.socket, report.sensors, report.connections, report.requests, report.rejected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_params_keep_wire_order() {
        let params = ParameterMap::new()
            .with("type", "DHT22")
            .with("Temperature", "25.5")
            .with("Humidity", "60.2");
        let out = OperationOutput {
            operation: "update",
            id: Some("sensor_001"),
            status: "ok",
            params: OrderedParams(&params),
        };

        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(
            json,
            r#"{"operation":"update","id":"sensor_001","status":"ok","params":{"type":"DHT22","Temperature":"25.5","Humidity":"60.2"}}"#
        );
    }
}
