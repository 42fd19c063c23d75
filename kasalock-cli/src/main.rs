//! Interactive terminal frontend for the kasalock escape room.
//!
//! Stands in for the graphical router: it renders each screen as text,
//! forwards input to the active stage controller, and follows the engine's
//! event stream through the two safes to the reveal.

use std::sync::Arc;

use kasalock::engine::{
    BuiltGame, EscapeRoom, EventStream, Game, GameEvent, ScreenState, StructuredFormatter,
};
use kasalock::sound::SoundBank;
use kasalock::utils::Terminal;

type Events = EventStream<GameEvent>;
type Room = BuiltGame<StructuredFormatter>;

#[cfg(feature = "audio")]
fn sound_bank() -> Arc<dyn SoundBank> {
    Arc::new(kasalock::sound::CueBank::new("sounds"))
}

#[cfg(not(feature = "audio"))]
fn sound_bank() -> Arc<dyn SoundBank> {
    Arc::new(kasalock::sound::NullSounds)
}

fn banner() {
    println!(
        "---------------------------------------------------------------",
    );
    println!(
        "██   ██  █████  ███████  █████  ██       ██████   ██████ ██   ██",
    );
    println!(
        "██  ██  ██   ██ ██      ██   ██ ██      ██    ██ ██      ██  ██ ",
    );
    println!(
        "█████   ███████ ███████ ███████ ██      ██    ██ ██      █████  ",
    );
    println!(
        "██  ██  ██   ██      ██ ██   ██ ██      ██    ██ ██      ██  ██ ",
    );
    println!(
        "██   ██ ██   ██ ███████ ██   ██ ███████  ██████   ██████ ██   ██",
    );
    println!(
        "---------------------------------------------------------------",
    );
}

#[tokio::main]
async fn main() {
    banner();

    let game = Game::<StructuredFormatter>::new()
        .with_sounds(sound_bank())
        .build();
    let mut events = game.get_events_stream();

    loop {
        match game.screen() {
            ScreenState::Stage1 => stage_one(&game, &mut events).await,
            ScreenState::Stage2 => stage_two(&game, &mut events).await,
            ScreenState::Reveal => {
                if !reveal(&game) {
                    break;
                }
                drain_to_screen_change(&mut events).await;
            }
        }
    }

    println!("Görüşmek üzere!");
}

/// Consumes events until the submit outcome is known. Returns `true` when
/// the screen changed (stage solved or restarted).
async fn wait_for_outcome(events: &mut Events) -> bool {
    loop {
        match events.next().await {
            Some(GameEvent::UnlockStarted { .. }) => println!("Açılıyor..."),
            Some(GameEvent::ScreenChanged { .. }) => return true,
            Some(GameEvent::WrongCredential { message, .. }) => {
                println!("!! {}", message);
                return false;
            }
            Some(_) => continue,
            None => return false,
        }
    }
}

/// Swallows queued events up to and including the next screen change, so a
/// restart doesn't leave stale events for the next submit.
async fn drain_to_screen_change(events: &mut Events) {
    while let Some(event) = events.next().await {
        if matches!(event, GameEvent::ScreenChanged { .. }) {
            return;
        }
    }
}

async fn stage_one(game: &Room, events: &mut Events) {
    println!();
    println!("== KASA 1 | Kasanın Şifresini Girin ==");
    let Some(stage) = game.stage() else { return };

    loop {
        let snapshot = stage.snapshot();
        println!("Şifre: [{}]", "•".repeat(snapshot.buffer.chars().count()));

        let input = Terminal::ask(
            "[0-9] rakam ekle | c temizle | s sil | ac kasayı aç",
            |answer| {
                let known = ["c", "s", "ac"].contains(&answer.to_lowercase().as_str());
                let digits = !answer.is_empty() && answer.chars().all(|c| c.is_ascii_digit());
                if known || digits {
                    Ok(())
                } else {
                    Err("Geçersiz giriş, tekrar dene!".to_string())
                }
            },
        );

        match input.answer.to_lowercase().as_str() {
            "c" => stage.clear(),
            "s" => stage.backspace(),
            "ac" => {
                if stage.snapshot().buffer.is_empty() {
                    println!("Önce bir şifre gir.");
                    continue;
                }
                stage.submit();
                if wait_for_outcome(events).await {
                    return;
                }
            }
            digits => {
                for digit in digits.chars() {
                    stage.append_digit(digit);
                }
            }
        }
    }
}

async fn stage_two(game: &Room, events: &mut Events) {
    println!();
    println!("== KASA 2 | İkinci Kasa ==");
    println!("Kasayı açtığında içinde seni bir sürpriz bekliyordu: başka bir kasa.");
    println!("Üst yüzeyine kazınmış sayılar, iki kelimelik bir şifreye işaret ediyor...");
    let Some(stage) = game.stage() else { return };

    loop {
        let input = Terminal::ask("Şifreyi yaz (!c temizle, !r başa dön):", |answer| {
            if answer.is_empty() {
                Err("Boş giriş, tekrar dene!".to_string())
            } else {
                Ok(())
            }
        });

        match input.answer.as_str() {
            "!r" => {
                game.restart();
                drain_to_screen_change(events).await;
                return;
            }
            "!c" => stage.clear(),
            text => {
                stage.set_buffer(text);
                stage.submit();
                if wait_for_outcome(events).await {
                    return;
                }
            }
        }
    }
}

/// Returns `false` when the user quits.
fn reveal(game: &Room) -> bool {
    println!();
    println!("== SON EKRAN ==");
    println!("İkinci kasanın içinde bu kez bir QR kod çıktı karşına.");
    println!("Seni fiziksel dünyanın ötesinde, dijital bir kapıya çağırıyor.");
    println!();
    println!("  [QR Kod 1]  Gizemli Web Sitesi");
    println!("  [QR Kod 2]  Olay Mantık Zinciri");
    println!();
    println!("(İç ses kaydı: voice/edanur2.mp3)");

    let input = Terminal::ask("r başa dön | q çıkış", |answer| {
        if ["r", "q"].contains(&answer.to_lowercase().as_str()) {
            Ok(())
        } else {
            Err("r veya q, tekrar dene!".to_string())
        }
    });

    if input.answer.eq_ignore_ascii_case("r") {
        game.restart();
        true
    } else {
        false
    }
}
