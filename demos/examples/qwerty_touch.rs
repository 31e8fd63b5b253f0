// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touch dispatch over an XML QWERTY layout.
//!
//! This example shows how to combine:
//! - `XmlLayoutReader` + `KeyboardBuilder` to lay out a description for a phone screen,
//! - `Keyboard::nearest_keys` / `Key::is_inside` to resolve touches (including ones
//!   that land in the margin past an edge key),
//! - shift, enter-key relabelling, resizing and long-press popups.
//!
//! Run:
//! - `cargo run -p softkey_demos --example qwerty_touch`
//! - `RUST_LOG=softkey_layout=debug cargo run -p softkey_demos --example qwerty_touch`

use kurbo::Point;
use softkey_layout::{
    DisplayMetrics, EnterKeyLabels, ImeOptions, KeyFace, Keyboard, KeyboardBuilder,
    LayoutToken, XmlLayoutReader,
};
use tracing_subscriber::EnvFilter;

const QWERTY: &str = include_str!("../layouts/qwerty.xml");
const MODE_NORMAL: i32 = 1;
const MODE_URL: i32 = 2;

fn reader() -> XmlLayoutReader<'static> {
    XmlLayoutReader::new(QWERTY)
        .with_mode_alias("mode_normal", MODE_NORMAL)
        .with_mode_alias("mode_url", MODE_URL)
}

fn describe(keyboard: &Keyboard, index: usize) -> String {
    let key = &keyboard.keys()[index];
    match key.face() {
        KeyFace::Label(label) => format!("{label:?}"),
        KeyFace::Icon(icon) => icon.name().to_owned(),
        KeyFace::Blank => format!("code {:?}", key.primary_code()),
    }
}

/// Floor a touch point to the whole-pixel grid keys are laid out on.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Touch coordinates are floored to whole pixels; `as` saturates out-of-range values."
)]
fn to_pixels(pt: Point) -> (i32, i32) {
    (pt.x.floor() as i32, pt.y.floor() as i32)
}

/// Resolve a touch the way a dispatcher would: clamp into the keyboard so margin
/// touches still find candidates, then let the edge-aware hit test decide.
fn resolve_touch(keyboard: &mut Keyboard, pt: Point) -> Option<usize> {
    let (x, y) = to_pixels(pt);
    let cx = x.clamp(0, (keyboard.total_width() - 1).max(0));
    let cy = y.clamp(0, (keyboard.total_height() - 1).max(0));
    let candidates = keyboard.nearest_keys(cx, cy).to_vec();
    candidates
        .into_iter()
        .find(|&index| keyboard.keys()[index].is_inside(x, y))
}

fn main() {
    // Structured logging; level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // A 1080 px wide phone at 2.75x density.
    let metrics = DisplayMetrics::new(1080, 2340).with_density(2.75, 2.75, 440.0);
    let builder = KeyboardBuilder::new(metrics).with_mode(MODE_NORMAL);
    let mut keyboard = match builder.build(reader()) {
        Ok(keyboard) => keyboard,
        Err(err) => {
            eprintln!("layout failed: {err}");
            return;
        }
    };

    tracing::info!(mode = MODE_NORMAL, "qwerty layout ready");
    println!(
        "== Layout: {} keys in {} rows, {}x{} px ==",
        keyboard.keys().len(),
        keyboard.rows().iter().filter(|r| !r.is_skipped()).count(),
        keyboard.total_width(),
        keyboard.total_height()
    );
    for (i, row) in keyboard.rows().iter().enumerate() {
        if row.is_skipped() {
            println!("row {i}: skipped (mode {})", row.mode());
            continue;
        }
        let faces: Vec<String> = row.keys().iter().map(|&k| describe(&keyboard, k)).collect();
        println!("row {i}: {}", faces.join(" "));
    }

    for (label, pt) in [
        ("middle of g", Point::new(540.0, 200.0)),
        ("between a and s", Point::new(216.0, 200.0)),
        ("left margin next to a", Point::new(-12.0, 220.0)),
        ("below the space bar", Point::new(500.0, 2000.0)),
        ("right of p", Point::new(1100.0, 60.0)),
    ] {
        println!("\n== Touch: {label} @ ({:.1}, {:.1}) ==", pt.x, pt.y);
        let (x, y) = to_pixels(pt);
        let near: Vec<String> = keyboard
            .nearest_keys(x, y)
            .to_vec()
            .into_iter()
            .map(|k| describe(&keyboard, k))
            .collect();
        println!("nearest: [{}]", near.join(", "));
        match resolve_touch(&mut keyboard, pt) {
            Some(index) => {
                let key = &keyboard.keys()[index];
                println!(
                    "hit {} rect={:?} center={:?}",
                    describe(&keyboard, index),
                    key.rect(),
                    key.center()
                );
            }
            None => println!("no key"),
        }
    }

    println!("\n== Shift ==");
    if let Some(shift) = keyboard.shift_key_indices()[0] {
        let rect = keyboard.keys()[shift].rect();
        let pt = rect.center();
        if let Some(index) = resolve_touch(&mut keyboard, pt)
            && let Some(key) = keyboard.key_mut(index)
        {
            key.on_pressed();
            println!("pressed: {:?}", key.visual_state());
            let (x, y) = to_pixels(pt);
            key.on_released(key.bounds().contains_point(x, y));
            println!("released: {:?}", key.visual_state());
        }
        println!("set_shift(true) changed: {}", keyboard.set_shift(true));
        println!("set_shift(true) changed: {}", keyboard.set_shift(true));
    }

    println!("\n== URL field ==");
    if let Ok(mut url) = KeyboardBuilder::new(metrics).with_mode(MODE_URL).build(reader()) {
        url.set_ime_options(ImeOptions(ImeOptions::ACTION_GO), &EnterKeyLabels::default());
        if let Some(enter) = url.enter_key() {
            println!("enter key now shows {}", describe(&url, enter));
        }
    }

    println!("\n== Resize to 720 px ==");
    keyboard.resize(720, 2340);
    for &k in keyboard.rows()[0].keys().iter().take(3) {
        let key = &keyboard.keys()[k];
        println!("{} x={} width={}", describe(&keyboard, k), key.x(), key.width());
    }

    println!("\n== Long press on e ==");
    let popup_chars = keyboard
        .keys()
        .iter()
        .find(|k| k.label() == Some("e"))
        .and_then(|k| k.popup_characters())
        .map(str::to_owned);
    if let Some(chars) = popup_chars {
        let template: Result<Vec<LayoutToken>, _> =
            XmlLayoutReader::new(r#"<Keyboard keyWidth="10%p" keyHeight="48dp"/>"#).collect();
        match template.map(|t| builder.build_popup(t, &chars, Some(4), 0)) {
            Ok(Ok(popup)) => {
                for (i, key) in popup.keys().iter().enumerate() {
                    println!("{} at ({}, {})", describe(&popup, i), key.x(), key.y());
                }
            }
            Ok(Err(err)) => eprintln!("popup failed: {err}"),
            Err(err) => eprintln!("popup template failed: {err}"),
        }
    }
}
