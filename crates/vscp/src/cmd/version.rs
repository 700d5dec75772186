use vscp_engine::API_VERSION;
use vscp_emulator::{EMULATOR_API_VERSION, EMULATOR_DB_VERSION};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("vscp {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: vscp");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("protocol_api: {API_VERSION}");
    println!("emulator: api={EMULATOR_API_VERSION}, db={EMULATOR_DB_VERSION}");
    println!("target: {}", env!("VSCP_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: emulator={}, cli=true",
        cfg!(feature = "emulator")
    );

    Ok(SUCCESS)
}
