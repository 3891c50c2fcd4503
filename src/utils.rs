use std::process::{Command, Stdio};
use std::thread;

/// Runs `command` detached from the window manager.
///
/// The child is waited on from a helper thread so it never lingers as a zombie.
pub fn spawn(command: Vec<String>) {
    let Some((program, args)) = command.split_first() else {
        warn!("not spawning an empty command");
        return;
    };
    let (program, args) = (program.clone(), args.to_vec());

    let res = thread::Builder::new()
        .name(format!("spawn {program}"))
        .spawn(move || {
            let mut child = match Command::new(&program)
                .args(&args)
                .stdin(Stdio::null())
                .spawn()
            {
                Ok(child) => child,
                Err(err) => {
                    warn!("error spawning {program}: {err}");
                    return;
                }
            };
            trace!("spawned {program} as pid {}", child.id());

            match child.wait() {
                Ok(status) if !status.success() => debug!("{program} exited with {status}"),
                Ok(_) => (),
                Err(err) => warn!("error waiting for {program}: {err}"),
            }
        });

    if let Err(err) = res {
        warn!("error starting the spawn thread: {err}");
    }
}
