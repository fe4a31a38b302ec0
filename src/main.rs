//! Fusion Rings entry point
//!
//! On the web this wires the canvas, pointer and page events into an
//! [`ArcadeGame`](fusion_rings::ArcadeGame) and drives it from
//! requestAnimationFrame. Natively it runs a short headless session.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, HtmlInputElement, MouseEvent, WheelEvent};

    use fusion_rings::audio::AudioManager;
    use fusion_rings::renderer::CanvasRenderer;
    use fusion_rings::{ArcadeGame, HudSnapshot, Settings, ThemeColors};

    /// Everything the frame callback and the event handlers share
    struct Game {
        arcade: ArcadeGame,
        renderer: CanvasRenderer,
        audio: AudioManager,
        settings: Settings,
        canvas: HtmlCanvasElement,
        last_time: f64,
        /// A frame callback is scheduled
        loop_running: bool,
        /// Last HUD written to the DOM
        shown_hud: Option<HudSnapshot>,
    }

    impl Game {
        /// Match the backing store to the element size, return the CSS size
        fn fit_canvas(&mut self) -> (f32, f32) {
            let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
            let client_w = self.canvas.client_width().max(1) as f64;
            let client_h = self.canvas.client_height().max(1) as f64;
            let width = (client_w * dpr) as u32;
            let height = (client_h * dpr) as u32;
            if self.canvas.width() != width || self.canvas.height() != height {
                self.canvas.set_width(width);
                self.canvas.set_height(height);
                log::debug!("Canvas resized to {}x{} (dpr {})", width, height, dpr);
            }
            self.renderer.resize(client_w, client_h, dpr);
            (client_w as f32, client_h as f32)
        }

        fn frame(&mut self, time: f64) {
            let dt = if self.last_time > 0.0 {
                (time - self.last_time) as f32
            } else {
                0.0
            };
            self.last_time = time;

            let (w, h) = self.fit_canvas();
            let commands = self.arcade.advance(dt, w, h);
            if !commands.is_empty() {
                self.renderer.draw(&commands);
            }
            let events = self.arcade.drain_events();
            self.audio.play_events(&events);
            self.update_hud();
        }

        /// Update HUD elements in DOM
        fn update_hud(&mut self) {
            let hud = self.arcade.hud();
            if self.shown_hud == Some(hud) {
                return;
            }
            self.shown_hud = Some(hud);

            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            if let Some(el) = document.query_selector("#hud-score .hud-value").ok().flatten() {
                el.set_text_content(Some(&hud.score.to_string()));
            }
            if let Some(el) = document.query_selector("#hud-mode .hud-value").ok().flatten() {
                el.set_text_content(Some(hud.fire_mode.as_str()));
            }
            if let Some(el) = document.get_element_by_id("hud-heat-bar") {
                let _ = el.set_attribute("style", &format!("width: {:.0}%", hud.heat_ratio * 100.0));
                let class = if hud.overheated { "heat-bar overheated" } else { "heat-bar" };
                let _ = el.set_attribute("class", class);
            }
            if let Some(el) = document.get_element_by_id("mute-btn") {
                el.set_text_content(Some(if hud.muted { "sound off" } else { "sound on" }));
            }
        }
    }

    /// Read the page's color pair from its CSS custom properties
    fn read_theme(fallback: &ThemeColors) -> ThemeColors {
        let window = web_sys::window();
        let root = window
            .as_ref()
            .and_then(|w| w.document())
            .and_then(|d| d.document_element());
        let style = match (window, root) {
            (Some(w), Some(root)) => w.get_computed_style(&root).ok().flatten(),
            _ => None,
        };
        let Some(style) = style else {
            return fallback.clone();
        };
        let read = |name: &str, current: &str| {
            style
                .get_property_value(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| current.to_string())
        };
        ThemeColors {
            foreground: read("--foreground", &fallback.foreground),
            background: read("--background", &fallback.background),
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            return;
        }

        log::info!("Fusion Rings starting...");

        let Some(window) = web_sys::window() else {
            log::error!("No window");
            return;
        };
        let Some(document) = window.document() else {
            log::error!("No document");
            return;
        };
        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No #canvas element, nothing to draw on");
            return;
        };

        let settings = Settings::load();
        let seed = js_sys::Date::now() as u64;
        let config = settings.engine_config(seed);
        let theme = read_theme(&config.theme);
        let audio = AudioManager::new(config.sound);

        let Some(renderer) = CanvasRenderer::new(&canvas, theme.clone()) else {
            log::error!("Canvas2D context unavailable");
            return;
        };

        let mut arcade = ArcadeGame::new(config);
        arcade.set_theme(theme);

        let game = Rc::new(RefCell::new(Game {
            arcade,
            renderer,
            audio,
            settings,
            canvas: canvas.clone(),
            last_time: 0.0,
            loop_running: true,
            shown_hud: None,
        }));

        setup_input_handlers(&canvas, game.clone());
        setup_mute_button(game.clone());
        setup_volume_slider(game.clone());
        setup_restart_button(game.clone());
        setup_visibility(game.clone());
        setup_teardown(game.clone());
        setup_theme_observer(game.clone());

        request_animation_frame(game);

        log::info!("Fusion Rings running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                game.borrow_mut()
                    .arcade
                    .pointer_move(event.offset_x() as f32, event.offset_y() as f32);
            });
            let _ = canvas
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.arcade.pointer_move(event.offset_x() as f32, event.offset_y() as f32);
                g.arcade.pointer_down();
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().arcade.pointer_up();
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().arcade.pointer_enter();
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerenter", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().arcade.pointer_leave();
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerleave", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Wheel toggles the fire mode; the cooldown runs on event timestamps
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: WheelEvent| {
                game.borrow_mut().arcade.wheel(event.time_stamp());
            });
            let _ = canvas.add_event_listener_with_callback("wheel", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_mute_button(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(btn) = document.get_element_by_id("mute-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = game.borrow_mut();
                let muted = g.arcade.toggle_mute();
                g.audio.set_muted(muted);
                g.settings.muted = muted;
                g.settings.save();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_volume_slider(game: Rc<RefCell<Game>>) {
        let Some(slider) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("volume"))
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };
        slider.set_value(&format!("{:.2}", game.borrow().settings.volume));
        let slider_clone = slider.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Ok(volume) = slider_clone.value().parse::<f32>() else {
                return;
            };
            let mut g = game.borrow_mut();
            g.audio.set_volume(volume);
            g.settings.volume = volume.clamp(0.0, 1.0);
            g.settings.save();
        });
        let _ = slider.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_restart_button(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.arcade.reset();
                g.shown_hud = None;
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Hidden tabs stop scheduling frames; the loop restarts on return
    fn setup_visibility(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let visible = document_clone.visibility_state() == web_sys::VisibilityState::Visible;
            let restart = {
                let mut g = game.borrow_mut();
                g.arcade.set_visible(visible);
                g.last_time = 0.0;
                let restart = visible && !g.loop_running;
                if restart {
                    g.loop_running = true;
                }
                restart
            };
            if restart {
                request_animation_frame(game.clone());
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Leaving the page releases the audio device
    fn setup_teardown(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut g = game.borrow_mut();
            g.arcade.set_visible(false);
            g.audio.release();
            log::info!("Fusion Rings stopped");
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Re-read the theme colors whenever the root element's class or data-theme changes
    fn setup_theme_observer(game: Rc<RefCell<Game>>) {
        let Some(root) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.document_element())
        else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_records: js_sys::Array| {
            let mut g = game.borrow_mut();
            let theme = read_theme(g.arcade.theme());
            if &theme != g.arcade.theme() {
                log::debug!("Theme changed: {} on {}", theme.foreground, theme.background);
                g.renderer.set_theme(theme.clone());
                g.arcade.set_theme(theme);
            }
        });
        let Ok(observer) = web_sys::MutationObserver::new(closure.as_ref().unchecked_ref()) else {
            log::warn!("MutationObserver unavailable - theme changes ignored");
            return;
        };
        let options = web_sys::MutationObserverInit::new();
        options.set_attributes(true);
        if observer.observe_with_options(&root, &options).is_err() {
            log::warn!("Could not observe theme attribute");
        }
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let keep_running = {
            let mut g = game.borrow_mut();
            g.frame(time);
            g.loop_running = g.arcade.is_visible();
            g.loop_running
        };
        if keep_running {
            request_animation_frame(game);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Headless session: a trigger-happy player sweeping the arena
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use fusion_rings::audio::AudioManager;
    use fusion_rings::consts::FRAME_MS;
    use fusion_rings::sim::GameEvent;
    use fusion_rings::{ArcadeGame, Settings};

    env_logger::init();
    log::info!("Fusion Rings (native) starting...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x5EED);
    let settings = Settings::load();
    let config = settings.engine_config(seed);
    let mut audio = AudioManager::new(config.sound);
    let mut game = ArcadeGame::new(config);

    let (width, height) = (960.0_f32, 540.0_f32);
    let frames = 60 * 60;
    let mut kills = 0usize;
    let mut overheats = 0usize;
    let mut commands = 0usize;

    game.pointer_enter();
    for frame in 0..frames {
        let t = frame as f32 * FRAME_MS;
        let sweep = (t * 0.0007).sin() * 0.5 + 0.5;
        game.pointer_move(width * sweep, height * 0.3);

        // Bursts with pauses so the cannon can cool
        if frame % 240 < 150 {
            game.pointer_down();
        } else {
            game.pointer_up();
        }
        if frame % 900 == 450 {
            game.wheel(t as f64);
        }

        commands += game.advance(FRAME_MS, width, height).len();
        let events = game.drain_events();
        for event in &events {
            match event {
                GameEvent::Kill { .. } => kills += 1,
                GameEvent::Overheated => overheats += 1,
                _ => {}
            }
        }
        audio.play_events(&events);
    }
    audio.release();

    let hud = game.hud();
    log::info!(
        "Session done: {} frames, score {}, {} kills, {} overheats, {} groups alive, {} draw commands",
        frames,
        hud.score,
        kills,
        overheats,
        game.state().groups.len(),
        commands
    );
    println!(
        "seed {:#x}: score {} ({} mode, heat {:.0}%)",
        seed,
        hud.score,
        hud.fire_mode.as_str(),
        hud.heat_ratio * 100.0
    );
}
