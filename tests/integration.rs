use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

fn run_bin(args: &[&str]) -> std::process::Output {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_antfield"));
    Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command")
}

fn assert_success(args: &[&str]) {
    let output = run_bin(args);

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
}

fn write_config(test_dir: &Path) {
    let config_contents = String::new()
        + "[world]\n"
        + "cols = 60\n"
        + "rows = 40\n"
        + "cell_size = 2.0\n"
        + "seed = 3\n"
        + "\n"
        + "[colony]\n"
        + "nest_x = 20.0\n"
        + "nest_y = 40.0\n"
        + "nest_radius = 6.0\n"
        + "n_agents = 200\n"
        + "\n"
        + "[pheromone]\n"
        + "evaporation_rate = 0.98\n"
        + "epsilon = 0.01\n"
        + "intensity_max = 255.0\n"
        + "deposit = 6.0\n"
        + "\n"
        + "[agent]\n"
        + "speed = 1.0\n"
        + "sensor_angle = 0.6\n"
        + "sensor_length = 8.0\n"
        + "turn_rate = 0.35\n"
        + "wiggle = 0.1\n"
        + "wander_turn = 0.5\n"
        + "bounce_jitter = 0.4\n"
        + "food_bite = 1\n"
        + "\n"
        + "[layout]\n"
        + "food = [ { col = 45, row = 15, width = 4, height = 4, amount = 50 } ]\n"
        + "obstacles = [ { col = 30, row = 5, width = 2, height = 20 } ]\n"
        + "\n"
        + "[output]\n"
        + "ticks_per_frame = 4\n"
        + "frames_per_file = 64\n"
        + "snapshots = true\n";

    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");
}

#[test]
fn basic_workflow() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("basic_workflow");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    write_config(&test_dir);

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    assert_success(&["--sim-dir", test_dir_str, "create"]);
    assert_success(&["--sim-dir", test_dir_str, "create"]);

    assert_success(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]);
    assert_success(&[
        "--sim-dir", test_dir_str, "paint", "--run-idx", "0", "--brush", "food", "--col", "10",
        "--row", "30", "--radius", "1", "--amount", "20",
    ]);
    assert_success(&[
        "--sim-dir", test_dir_str, "paint", "--run-idx", "0", "--brush", "obstacle", "--col", "40",
        "--row", "10",
    ]);
    assert_success(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]);

    assert_success(&["--sim-dir", test_dir_str, "resume", "--run-idx", "1"]);
    assert_success(&["--sim-dir", test_dir_str, "reset", "--run-idx", "1"]);
    assert_success(&["--sim-dir", test_dir_str, "resume", "--run-idx", "1"]);

    assert_success(&["--sim-dir", test_dir_str, "analyze"]);

    let run_0 = test_dir.join("run-0000");
    assert!(run_0.join("checkpoint.msgpack").is_file());
    assert!(run_0.join("trajectory-0002.msgpack").is_file());
    let results = fs::read_to_string(run_0.join("results.json")).expect("failed to read results");
    let results: serde_json::Value =
        serde_json::from_str(&results).expect("failed to parse results");
    assert_eq!(results[3]["final"]["tick"], 3 * 4 * 64);

    assert_success(&["--sim-dir", test_dir_str, "clean"]);
    assert!(!run_0.exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn rejects_invalid_input() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("rejects_invalid_input");

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    // No config yet.
    assert!(!run_bin(&["--sim-dir", test_dir_str, "create"]).status.success());

    write_config(&test_dir);
    assert_success(&["--sim-dir", test_dir_str, "create"]);

    // Paint outside the grid and resume a missing run.
    let args = [
        "--sim-dir", test_dir_str, "paint", "--run-idx", "0", "--brush", "erase", "--col", "60",
        "--row", "0",
    ];
    assert!(!run_bin(&args).status.success());
    assert!(!run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "7"]).status.success());

    // Zero-sized grid.
    let config = fs::read_to_string(test_dir.join("config.toml")).expect("failed to read config");
    fs::write(test_dir.join("config.toml"), config.replace("rows = 40", "rows = 0"))
        .expect("failed to write config file");
    assert!(!run_bin(&["--sim-dir", test_dir_str, "analyze"]).status.success());

    fs::remove_dir_all(&test_dir).ok();
}
