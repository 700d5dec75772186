use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use vscp_emulator::{Emulator, SensorTable};

use crate::cmd::EmulateArgs;
use crate::exit::{emulator_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_serve_report, OutputFormat, ServeReport};

#[cfg(unix)]
pub fn run(args: EmulateArgs, format: OutputFormat) -> CliResult<i32> {
    use std::io::ErrorKind;
    use std::time::Duration;

    use tracing::info;
    use vscp_emulator::serve;
    use vscp_transport::{StreamConfig, StreamTransport, TransportError, UnixDomainSocket};

    use crate::exit::transport_error;

    const POLL: Duration = Duration::from_millis(100);

    let sensors = load_sensors(&args)?;
    let sensor_count = sensors.len();
    let mut emulator = Emulator::new(sensors);

    let listener =
        UnixDomainSocket::bind(&args.socket).map_err(|err| transport_error("bind failed", err))?;
    info!(sensors = sensor_count, path = ?listener.path(), "emulator ready");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut report = ServeReport {
        socket: args.socket.display().to_string(),
        sensors: sensor_count,
        connections: 0,
        requests: 0,
        rejected: 0,
    };

    listener
        .set_nonblocking(true)
        .map_err(|err| transport_error("listener setup failed", err))?;

    while running.load(Ordering::SeqCst) {
        let stream = match listener.accept() {
            Ok(stream) => stream,
            Err(TransportError::Accept(err)) if err.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(POLL);
                continue;
            }
            Err(err) => return Err(transport_error("accept failed", err)),
        };
        stream
            .set_nonblocking(false)
            .map_err(|err| crate::exit::io_error("accept failed", err))?;
        report.connections = report.connections.saturating_add(1);

        let mut transport = StreamTransport::with_config(stream, StreamConfig::serving());
        let summary = serve(&mut emulator, &mut transport, &running, POLL)
            .map_err(|err| emulator_error("serve failed", err))?;
        report.requests = report.requests.saturating_add(summary.requests);
        report.rejected = report.rejected.saturating_add(summary.rejected);

        if let Some(count) = args.count {
            if report.connections >= count {
                break;
            }
        }
    }

    print_serve_report(&report, format);
    Ok(SUCCESS)
}

#[cfg(not(unix))]
pub fn run(args: EmulateArgs, _format: OutputFormat) -> CliResult<i32> {
    let _ = load_sensors(&args)?;
    Err(CliError::new(
        crate::exit::USAGE,
        "emulate requires unix domain sockets",
    ))
}

fn load_sensors(args: &EmulateArgs) -> CliResult<SensorTable> {
    match &args.sensors {
        Some(path) => SensorTable::load(path).map_err(|err| {
            emulator_error(&format!("failed loading {}", path.display()), err)
        }),
        None => Ok(SensorTable::default()),
    }
}

#[cfg_attr(not(unix), allow(dead_code))]
fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
