//! Recognizes a note run and a chord played into a loopback transport,
//! then stops the loop from inside the chord handler.
//!
//! Run with `cargo run --example chord_monitor`.

use std::thread;
use std::time::Duration;

use chordflow::prelude::*;

fn main() -> chordflow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .init();

    let transport = LoopbackTransport::poll();
    let keys = transport.clone();
    let mut engine = EventLoop::new(transport)?;

    let stop = engine.stop_handle();
    engine.add_handler_ident("C4 Major", move || {
        println!("C major!");
        stop.stop();
    })?;
    engine.add_handler(Sequence::from_ascii("C4 D4 E4")?, || {
        println!("C D E run");
    });

    // Simulated player on a second thread
    thread::spawn(move || {
        for note in [60, 62, 64] {
            keys.send_note_on(note, 96);
            keys.send_note_off(note);
            thread::sleep(Duration::from_millis(120));
        }
        for note in [60, 64, 67] {
            keys.send_note_on(note, 96);
            thread::sleep(Duration::from_millis(60));
        }
    });

    // Blocks until the chord handler fires the stop handle
    engine.start(true)?;
    Ok(())
}
