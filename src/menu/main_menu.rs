use crate::config::{Config, Language, save_settings};
use crate::menu::handlers::{run_sharpest_frame_extractor, run_video_transcoder};
use anyhow::Result;
use console::{Term, style};
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    if let Some(last) = config.settings.recent_paths.first() {
        println!("{}", style(t!("main_menu.last_used", path = last)).dim());
    }

    let options = vec![
        t!("main_menu.opt_extract"),
        t!("main_menu.opt_transcode"),
        t!("main_menu.opt_language"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_sharpest_frame_extractor(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(1) => {
            run_video_transcoder(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(2) => {
            show_language_menu(term, config)?;
            Ok(true)
        }
        // ESC 或離開
        _ => Ok(false),
    }
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let items: Vec<String> = Language::ALL.iter().map(ToString::to_string).collect();
    let default_index = Language::ALL
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = Language::ALL[selection];
    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_settings(&config.settings)?;
        println!(
            "\n{} {}",
            style(t!("common.settings_saved")).green(),
            selected_lang
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_text_exists_for_every_language() {
        for lang in Language::ALL {
            let exit = t!("main_menu.exit", locale = lang.as_str());
            assert!(!exit.is_empty());
            assert_ne!(exit, "main_menu.exit");
        }
        assert_eq!(t!("main_menu.exit", locale = "zh-TW"), "離開");
        assert_eq!(t!("main_menu.exit", locale = "en-US"), "Exit");
    }
}
