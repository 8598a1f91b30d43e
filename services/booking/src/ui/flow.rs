//! services/booking/src/ui/flow.rs
//!
//! This is the main control loop for the interactive booking funnel. It
//! reads one user action at a time, mutates the browse state, and renders
//! the next step.

use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use tutorboard_core::domain::Teacher;
use tutorboard_core::funnel::{EntryMode, FunnelStage};
use tutorboard_core::schedule::search_teachers;
use uuid::Uuid;

use crate::error::ClientError;
use crate::ui::state::{AppState, BrowseState};

/// What a single prompt step decided.
enum StepOutcome {
    /// The funnel moved (forward or back); render the next step.
    Continue,
    /// Leave the funnel and return to the main menu.
    ExitToMenu,
}

/// Runs the top-level menu until the user quits.
pub async fn run(app_state: AppState) -> Result<(), ClientError> {
    let theme = ColorfulTheme::default();
    loop {
        let choice = Select::with_theme(&theme)
            .with_prompt("TutorBoard")
            .items(&["Book by date", "Book by teacher", "Quit"])
            .default(0)
            .interact()?;

        match choice {
            0 => browse(&app_state, EntryMode::DateFirst).await?,
            1 => browse(&app_state, EntryMode::TeacherFirst).await?,
            _ => return Ok(()),
        }
    }
}

/// One browse-and-book run in a single entry mode.
async fn browse(app_state: &AppState, mode: EntryMode) -> Result<(), ClientError> {
    let theme = ColorfulTheme::default();
    let mut state = BrowseState::new(app_state, mode);
    state.refresh().await;

    loop {
        render_banner(&mut state);

        let outcome = match state.funnel.stage() {
            FunnelStage::Bookable | FunnelStage::Failed => {
                confirm_step(&mut state, &theme).await?
            }
            _ => {
                if mode == EntryMode::TeacherFirst && state.funnel.selected_teacher().is_none() {
                    pin_teacher_step(&mut state, &theme).await?
                } else if state.funnel.selected_date().is_none() {
                    date_step(&mut state, &theme).await?
                } else if state.funnel.selected_time().is_none() {
                    time_step(&mut state, &theme)?
                } else {
                    teacher_step(&mut state, &theme)?
                }
            }
        };

        if let StepOutcome::ExitToMenu = outcome {
            return Ok(());
        }
    }
}

/// Balance, the inline error banner, and the last confirmation (shown once).
fn render_banner(state: &mut BrowseState) {
    if let Some(balance) = state.balance {
        println!(
            "{}",
            style(format!("Credits: {}", balance.balance)).cyan()
        );
    }
    if let Some(error) = &state.last_error {
        println!("{}", style(format!("! {}", error)).red());
    }
    if let Some(confirmation) = state.last_confirmation.take() {
        match &confirmation.session.meeting_link {
            Some(link) => println!(
                "{}",
                style(format!("Booked! Join at {}", link)).green()
            ),
            None => println!("{}", style("Booked!").green()),
        }
    }
}

fn teacher_label(teacher: &Teacher) -> String {
    format!(
        "{} ({}) - {:.1}/5 from {} ratings, {} followers",
        teacher.name,
        teacher.country,
        teacher.rating_avg,
        teacher.rating_count,
        teacher.followers_count
    )
}

fn teacher_label_by_id(state: &BrowseState, teacher_id: Uuid) -> String {
    match state.teacher_by_id(teacher_id) {
        Some(teacher) => teacher_label(teacher),
        None => teacher_id.to_string(),
    }
}

/// Teacher-first entry: search the roster, pin a teacher, reload narrowed.
async fn pin_teacher_step(
    state: &mut BrowseState,
    theme: &ColorfulTheme,
) -> Result<StepOutcome, ClientError> {
    let query: String = Input::with_theme(theme)
        .with_prompt("Search teachers (leave empty for all)")
        .allow_empty(true)
        .interact_text()?;

    let matches = search_teachers(&state.teachers, &query);
    if matches.is_empty() {
        println!("No teachers match \"{}\".", query.trim());
        return Ok(StepOutcome::Continue);
    }

    let mut items: Vec<String> = matches.iter().map(|t| teacher_label(t)).collect();
    items.push("Back".to_string());

    let choice = Select::with_theme(theme)
        .with_prompt("Pick a teacher")
        .items(&items)
        .default(0)
        .interact()?;
    if choice == matches.len() {
        return Ok(StepOutcome::ExitToMenu);
    }

    let teacher_id = matches[choice].id;
    state.pin_teacher(teacher_id).await;
    Ok(StepOutcome::Continue)
}

/// Calendar step: pick a day with availability, refresh, or go back.
async fn date_step(
    state: &mut BrowseState,
    theme: &ColorfulTheme,
) -> Result<StepOutcome, ClientError> {
    let days = state.funnel.day_index();

    if days.is_empty() {
        println!("No open sessions in the booking window.");
        let choice = Select::with_theme(theme)
            .with_prompt("Nothing available")
            .items(&["Refresh", "Back"])
            .default(0)
            .interact()?;
        if choice == 0 {
            state.refresh().await;
            return Ok(StepOutcome::Continue);
        }
        return Ok(back_from_date(state));
    }

    let dates: Vec<_> = days.keys().copied().collect();
    let mut items: Vec<String> = days
        .iter()
        .map(|(date, sessions)| format!("{} - {} open", date, sessions.len()))
        .collect();
    items.push("Refresh".to_string());
    items.push("Back".to_string());

    let choice = Select::with_theme(theme)
        .with_prompt("Pick a day")
        .items(&items)
        .default(0)
        .interact()?;

    if choice < dates.len() {
        state.funnel.select_date(dates[choice]);
        return Ok(StepOutcome::Continue);
    }
    if choice == dates.len() {
        state.refresh().await;
        return Ok(StepOutcome::Continue);
    }
    Ok(back_from_date(state))
}

/// Back from the calendar: in teacher-first mode return to the roster,
/// otherwise leave the funnel.
fn back_from_date(state: &mut BrowseState) -> StepOutcome {
    if state.funnel.mode() == EntryMode::TeacherFirst {
        state.funnel.clear_teacher();
        StepOutcome::Continue
    } else {
        StepOutcome::ExitToMenu
    }
}

/// Time-of-day step for the selected day.
fn time_step(state: &mut BrowseState, theme: &ColorfulTheme) -> Result<StepOutcome, ClientError> {
    let times = state.funnel.times_for_selected_date();

    if times.is_empty() {
        // A refresh can empty out a previously picked day.
        println!("Nothing available on this day.");
        state.funnel.clear_date();
        return Ok(StepOutcome::Continue);
    }

    let keys: Vec<_> = times.keys().copied().collect();
    let mut items: Vec<String> = times
        .iter()
        .map(|(time, sessions)| {
            let teachers = sessions.len();
            if teachers == 1 {
                format!("{} - 1 teacher", time.format("%H:%M"))
            } else {
                format!("{} - {} teachers", time.format("%H:%M"), teachers)
            }
        })
        .collect();
    items.push("Back".to_string());

    let choice = Select::with_theme(theme)
        .with_prompt("Pick a time")
        .items(&items)
        .default(0)
        .interact()?;

    if choice < keys.len() {
        state.funnel.select_time(keys[choice]);
    } else {
        state.funnel.clear_date();
    }
    Ok(StepOutcome::Continue)
}

/// Date-first teacher step: only teachers bookable at the chosen slot.
fn teacher_step(
    state: &mut BrowseState,
    theme: &ColorfulTheme,
) -> Result<StepOutcome, ClientError> {
    let slot_sessions = state.funnel.sessions_at_selected_slot();

    if slot_sessions.is_empty() {
        println!("No teachers at this time anymore.");
        state.funnel.clear_time();
        return Ok(StepOutcome::Continue);
    }

    let teacher_ids: Vec<Uuid> = slot_sessions.iter().map(|s| s.teacher_id).collect();
    let mut items: Vec<String> = slot_sessions
        .iter()
        .map(|s| {
            format!(
                "{} - {} credits",
                teacher_label_by_id(state, s.teacher_id),
                s.price_credits
            )
        })
        .collect();
    items.push("Back".to_string());

    let choice = Select::with_theme(theme)
        .with_prompt("Pick a teacher")
        .items(&items)
        .default(0)
        .interact()?;

    if choice < teacher_ids.len() {
        state.funnel.select_teacher(teacher_ids[choice]);
    } else {
        state.funnel.clear_time();
    }
    Ok(StepOutcome::Continue)
}

/// Final step: show the resolved session and submit, or step back.
async fn confirm_step(
    state: &mut BrowseState,
    theme: &ColorfulTheme,
) -> Result<StepOutcome, ClientError> {
    let resolved = state
        .funnel
        .resolve_selection()
        .map(|s| (s.teacher_id, s.price_credits));
    let Some((teacher_id, price_credits)) = resolved else {
        // The picks went stale underneath us; start the narrowing over.
        state.funnel.reset();
        return Ok(StepOutcome::Continue);
    };
    // The picks themselves are the viewer-local rendering of the slot.
    let (Some(date), Some(time)) = (state.funnel.selected_date(), state.funnel.selected_time())
    else {
        state.funnel.reset();
        return Ok(StepOutcome::Continue);
    };

    let summary = format!(
        "{} at {} with {} for {} credits",
        date,
        time.format("%H:%M"),
        teacher_label_by_id(state, teacher_id),
        price_credits
    );
    println!("{}", style(&summary).bold());
    if let Some(balance) = state.balance {
        if i64::from(price_credits) > balance.balance {
            println!(
                "{}",
                style("This costs more than your balance; the server will decide.").yellow()
            );
        }
    }

    let confirmed = Confirm::with_theme(theme)
        .with_prompt("Book this session?")
        .default(true)
        .interact()?;

    if confirmed {
        state.confirm_booking().await;
        return Ok(StepOutcome::Continue);
    }

    let choice = Select::with_theme(theme)
        .with_prompt("Change what?")
        .items(&["Teacher", "Time", "Date", "Back to menu"])
        .default(0)
        .interact()?;
    match choice {
        0 => state.funnel.clear_teacher(),
        1 => state.funnel.clear_time(),
        2 => state.funnel.clear_date(),
        _ => return Ok(StepOutcome::ExitToMenu),
    }
    Ok(StepOutcome::Continue)
}
