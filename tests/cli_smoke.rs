use std::path::PathBuf;
use std::process::Command;

fn repliq_bin() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_repliq")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let profile_dir = if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            };
            let mut p = PathBuf::from("target").join(profile_dir);
            p.push(if cfg!(windows) { "repliq.exe" } else { "repliq" });
            p
        })
}

#[test]
fn cli_background_writes_png() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();
    let out_path = dir.join("background.png");
    let _ = std::fs::remove_file(&out_path);

    let status = Command::new(repliq_bin())
        .args(["background", "--label", "acme.test", "--width", "320", "--height", "500"])
        .arg("--out")
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(status.success());

    let img = image::open(&out_path).unwrap();
    assert_eq!((img.width(), img.height()), (320, 500));
}

#[test]
fn cli_geometry_prints_the_overlay_box() {
    let out = Command::new(repliq_bin())
        .args([
            "geometry",
            "--mode",
            "small-bubble",
            "--position",
            "bottom-right",
            "--video-width",
            "100",
            "--video-height",
            "100",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());

    let bx: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(bx["x"], 1110.0);
    assert_eq!(bx["y"], 550.0);
    assert_eq!(bx["width"], 150.0);
    assert_eq!(bx["height"], 150.0);
}

#[test]
fn cli_rejects_unknown_shapes() {
    let out = Command::new(repliq_bin())
        .args(["compose", "--overlay", "clip.webm", "--shape", "hexagon", "--out", "x.webm"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("hexagon"));
}
