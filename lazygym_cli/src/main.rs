use clap::{Args, Parser, Subcommand, ValueEnum};
use lazygym_core::coordinator::SessionSummary;
use lazygym_core::export::{self, ExportBundle};
use lazygym_core::progression::ProgressionChange;
use lazygym_core::*;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lazygym")]
#[command(about = "Workout tracker with automatic weight and rep progression", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage exercises
    #[command(subcommand)]
    Exercise(ExerciseCommand),

    /// Manage workout templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Start a workout from a template (name or id)
    Start { template: String },

    /// Show the active workout
    Status,

    /// Record reps for a set of the active workout (1-based numbers)
    Complete {
        exercise: usize,
        set: usize,
        reps: u32,
    },

    /// Change the weight of a set in the active workout
    Weight {
        /// Exercise instance id, or its 1-based number in the workout
        exercise: String,
        /// 1-based set number
        set: usize,
        /// New weight in kg
        #[arg(value_parser = parse_weight)]
        kg: f64,
    },

    /// Finish the active workout and apply progression
    End,

    /// List finished workouts
    History {
        /// Only show the most recent N workouts
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Summary statistics over the workout history
    Stats,

    /// Workouts per week
    Frequency {
        #[arg(long, value_parser = weeks_parser())]
        weeks: Option<u32>,
    },

    /// Per-workout metric series for one exercise
    Progression {
        /// Exercise name or id
        exercise: String,
        /// weight, reps or volume
        #[arg(long, default_value = "weight")]
        metric: AnalyticsMetric,
        #[arg(long, value_parser = weeks_parser())]
        weeks: Option<u32>,
    },

    /// Export stored data
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum ExerciseCommand {
    /// List stored exercises
    List,
    /// Add an exercise
    Add(ExerciseArgs),
    /// Edit an exercise (name or id); only given fields change
    Edit {
        exercise: String,
        #[command(flatten)]
        changes: ExerciseEdit,
    },
    /// Remove an exercise (name or id)
    Remove { exercise: String },
}

#[derive(Args)]
struct ExerciseArgs {
    name: String,
    /// amrap, pyramid or free
    #[arg(long = "type", default_value = "amrap")]
    progression_type: ProgressionType,
    /// Working weight in kg
    #[arg(long, default_value_t = 0.0, value_parser = parse_weight)]
    weight: f64,
    /// Treat as a lower body exercise when no body part is set
    #[arg(long)]
    lower: bool,
    /// upper, lower or full
    #[arg(long)]
    body_part: Option<BodyPart>,
    /// Starting reps for pyramid ladders
    #[arg(long)]
    base_reps: Option<u32>,
}

#[derive(Args)]
struct ExerciseEdit {
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "type")]
    progression_type: Option<ProgressionType>,
    #[arg(long, value_parser = parse_weight)]
    weight: Option<f64>,
    #[arg(long)]
    upper_body: Option<bool>,
    #[arg(long)]
    body_part: Option<BodyPart>,
    #[arg(long)]
    base_reps: Option<u32>,
    /// Forget the recorded pyramid reps
    #[arg(long)]
    reset_reps: bool,
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// List workout templates
    List,
    /// Add a template from stored exercises
    Add {
        name: String,
        /// upper, lower or full
        #[arg(long, default_value = "full")]
        focus: BodyPart,
        /// Exercise name or id; repeat in workout order
        #[arg(long = "exercise", required = true)]
        exercises: Vec<String>,
    },
    /// Remove a template (name or id)
    Remove { template: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

/// Weights in kg: finite and not negative
fn parse_weight(s: &str) -> std::result::Result<f64, String> {
    let kg: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if kg.is_finite() && kg >= 0.0 {
        Ok(kg)
    } else {
        Err(format!("{} is not a usable weight", s))
    }
}

fn weeks_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=i64::from(analytics::MAX_WINDOW_WEEKS))
}

fn main() -> ExitCode {
    lazygym_core::logging::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let mut gym = Coordinator::open(FileStore::new(&data_dir), config)?;

    match cli.command {
        Commands::Exercise(cmd) => cmd_exercise(&mut gym, cmd)?,
        Commands::Template(cmd) => cmd_template(&mut gym, cmd)?,
        Commands::Start { template } => cmd_start(&mut gym, &template)?,
        Commands::Status => cmd_status(&gym)?,
        Commands::Complete {
            exercise,
            set,
            reps,
        } => cmd_complete(&mut gym, exercise, set, reps)?,
        Commands::Weight { exercise, set, kg } => cmd_weight(&mut gym, &exercise, set, kg)?,
        Commands::End => cmd_end(&mut gym)?,
        Commands::History { limit } => cmd_history(&gym, limit),
        Commands::Stats => cmd_stats(&gym),
        Commands::Frequency { weeks } => cmd_frequency(&gym, weeks),
        Commands::Progression {
            exercise,
            metric,
            weeks,
        } => cmd_progression(&gym, &exercise, metric, weeks)?,
        Commands::Export { format, out } => cmd_export(&gym, format, &out)?,
    }

    // Writes that failed during the command get one more try
    if gym.is_dirty() {
        gym.flush()?;
    }
    Ok(())
}

fn find_exercise<'a, S: Persistence>(gym: &'a Coordinator<S>, key: &str) -> Result<&'a Exercise> {
    let found = match Uuid::parse_str(key) {
        Ok(id) => gym.find_exercise(id),
        Err(_) => gym.find_exercise_by_name(key),
    };
    found.ok_or_else(|| Error::ExerciseNotFound(key.to_string()))
}

fn find_template<'a, S: Persistence>(
    gym: &'a Coordinator<S>,
    key: &str,
) -> Result<&'a WorkoutTemplate> {
    let found = match Uuid::parse_str(key) {
        Ok(id) => gym.find_template(id),
        Err(_) => gym.find_template_by_name(key),
    };
    found.ok_or_else(|| Error::TemplateNotFound(key.to_string()))
}

/// Convert a 1-based number from the command line to an index
fn to_index(number: usize, what: &str) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| Error::Other(format!("{} numbers start at 1", what)))
}

fn cmd_exercise<S: Persistence>(gym: &mut Coordinator<S>, cmd: ExerciseCommand) -> Result<()> {
    match cmd {
        ExerciseCommand::List => {
            if gym.exercises().is_empty() {
                println!("No exercises.");
            }
            for exercise in gym.exercises() {
                print_exercise(exercise);
            }
        }

        ExerciseCommand::Add(args) => {
            let mut exercise =
                Exercise::new(args.name, args.progression_type, !args.lower, args.weight);
            if let Some(body_part) = args.body_part {
                exercise = exercise.with_body_part(body_part);
            }
            if let Some(base_reps) = args.base_reps {
                exercise = exercise.with_base_reps(base_reps);
            }
            let name = exercise.name.clone();
            gym.add_exercise(exercise)?;
            println!("✓ Added exercise {}", name);
        }

        ExerciseCommand::Edit { exercise, changes } => {
            let mut edited = find_exercise(gym, &exercise)?.clone();
            if let Some(name) = changes.name {
                edited.name = name;
            }
            if let Some(progression_type) = changes.progression_type {
                edited.progression_type = progression_type;
            }
            if let Some(weight) = changes.weight {
                edited.current_weight = weight;
            }
            if let Some(upper) = changes.upper_body {
                edited.is_upper_body = upper;
            }
            if let Some(body_part) = changes.body_part {
                edited.body_part = Some(body_part);
            }
            if let Some(base_reps) = changes.base_reps {
                edited.base_reps = base_reps;
            }
            if changes.reset_reps {
                edited.current_reps = None;
            }
            println!("✓ Updated exercise {}", edited.name);
            gym.update_exercise(edited)?;
        }

        ExerciseCommand::Remove { exercise } => {
            let id = find_exercise(gym, &exercise)?.id;
            let removed = gym.delete_exercise(id)?;
            println!("✓ Removed exercise {}", removed.name);
        }
    }
    Ok(())
}

fn print_exercise(exercise: &Exercise) {
    let body = match exercise.body_part {
        Some(part) => part.display_name(),
        None if exercise.is_upper_body => "Upper",
        None => "Lower",
    };
    let detail = match exercise.progression_type {
        ProgressionType::Pyramid => match &exercise.current_reps {
            Some(reps) => format!("reps {:?}", reps),
            None => format!("base {} reps", exercise.base_reps),
        },
        _ => format!("{:.1}kg", exercise.current_weight),
    };
    println!(
        "  {}  {} [{}, {}] {}",
        exercise.id,
        exercise.name,
        exercise.progression_type.display_name(),
        body,
        detail
    );
}

fn cmd_template<S: Persistence>(gym: &mut Coordinator<S>, cmd: TemplateCommand) -> Result<()> {
    match cmd {
        TemplateCommand::List => {
            if gym.templates().is_empty() {
                println!("No workout templates.");
            }
            for template in gym.templates() {
                let names: Vec<_> = template
                    .exercise_instances
                    .iter()
                    .map(|i| i.exercise.name.as_str())
                    .collect();
                println!(
                    "  {}  {} ({}): {}",
                    template.id,
                    template.name,
                    template.focus.display_name(),
                    names.join(", ")
                );
            }
        }

        TemplateCommand::Add {
            name,
            focus,
            exercises,
        } => {
            let ids = exercises
                .iter()
                .map(|key| find_exercise(gym, key).map(|e| e.id))
                .collect::<Result<Vec<_>>>()?;
            let template = gym.build_template(name, focus, &ids)?;
            println!(
                "✓ Added template {} with {} exercises",
                template.name,
                template.exercise_instances.len()
            );
            gym.add_template(template);
        }

        TemplateCommand::Remove { template } => {
            let id = find_template(gym, &template)?.id;
            let removed = gym.delete_template(id)?;
            println!("✓ Removed template {}", removed.name);
        }
    }
    Ok(())
}

fn cmd_start<S: Persistence>(gym: &mut Coordinator<S>, template: &str) -> Result<()> {
    let id = find_template(gym, template)?.id;
    let session = gym.start_session(id)?;
    println!("✓ Started {}", session.template.name);
    print_session(session);
    Ok(())
}

fn cmd_status<S: Persistence>(gym: &Coordinator<S>) -> Result<()> {
    let session = gym.active_session().ok_or(Error::NoActiveSession)?;
    print_session(session);
    Ok(())
}

fn print_session(session: &WorkoutSession) {
    println!();
    println!(
        "  {} ({} focus), started {}",
        session.template.name,
        session.template.focus.display_name(),
        session.start_time.format("%Y-%m-%d %H:%M")
    );
    for (n, instance) in session.exercise_instances().iter().enumerate() {
        let marker = if instance.is_completed { "✓" } else { " " };
        println!(
            "  {} {}. {} [{}]  id {}",
            marker,
            n + 1,
            instance.exercise.name,
            instance.effective_progression_type().display_name(),
            instance.id
        );
        for (s, set) in instance.sets.iter().enumerate() {
            let planned = if set.is_to_failure() {
                "max".to_string()
            } else {
                set.planned_reps.to_string()
            };
            let done = match set.actual_reps {
                Some(reps) if set.is_completed => format!("  done: {}", reps),
                _ => String::new(),
            };
            println!(
                "       set {}: {} reps @ {:.1}kg{}",
                s + 1,
                planned,
                set.weight,
                done
            );
        }
    }
    println!();
}

fn cmd_complete<S: Persistence>(
    gym: &mut Coordinator<S>,
    exercise: usize,
    set: usize,
    reps: u32,
) -> Result<()> {
    let exercise_index = to_index(exercise, "Exercise")?;
    let set_index = to_index(set, "Set")?;
    gym.complete_set(exercise_index, set_index, reps)?;
    println!("✓ Exercise {} set {}: {} reps", exercise, set, reps);
    Ok(())
}

fn cmd_weight<S: Persistence>(
    gym: &mut Coordinator<S>,
    exercise: &str,
    set: usize,
    kg: f64,
) -> Result<()> {
    let instance_id = match Uuid::parse_str(exercise) {
        Ok(id) => id,
        Err(_) => {
            let number: usize = exercise
                .parse()
                .map_err(|_| Error::Other(format!("Not an exercise number or id: {}", exercise)))?;
            let index = to_index(number, "Exercise")?;
            let session = gym.active_session().ok_or(Error::NoActiveSession)?;
            let instances = session.exercise_instances();
            instances
                .get(index)
                .map(|i| i.id)
                .ok_or(Error::ExerciseIndexOutOfRange {
                    index,
                    len: instances.len(),
                })?
        }
    };
    gym.update_set_weight(instance_id, to_index(set, "Set")?, kg)?;
    println!("✓ Set {} weight now {:.1}kg", set, kg);
    Ok(())
}

fn cmd_end<S: Persistence>(gym: &mut Coordinator<S>) -> Result<()> {
    let summary = gym.end_session()?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    println!("\n✓ Workout finished: {}", summary.session.template.name);
    for outcome in &summary.outcomes {
        match &outcome.change {
            ProgressionChange::Weight { from, to, .. } if to > from => {
                println!("  {}: {:.1}kg -> {:.1}kg", outcome.exercise_name, from, to)
            }
            ProgressionChange::Weight { to, .. } => {
                println!("  {}: stays at {:.1}kg", outcome.exercise_name, to)
            }
            ProgressionChange::Reps { to, .. } => {
                println!("  {}: next reps {:?}", outcome.exercise_name, to)
            }
            ProgressionChange::Manual => {
                println!("  {}: no automatic change", outcome.exercise_name)
            }
            ProgressionChange::MissingFinalReps | ProgressionChange::NoCompletedSets => {}
        }
    }
    for warning in &summary.warnings {
        eprintln!("  warning: {}", warning);
    }
}

fn cmd_history<S: Persistence>(gym: &Coordinator<S>, limit: Option<usize>) {
    let history = gym.history();
    if history.is_empty() {
        println!("No workouts yet.");
        return;
    }
    let skip = limit.map_or(0, |n| history.len().saturating_sub(n));
    for session in history.iter().skip(skip) {
        let completed_sets: usize = session
            .exercise_instances()
            .iter()
            .map(|i| i.completed_sets().len())
            .sum();
        println!(
            "  {}  {} ({} exercises, {} sets completed)",
            session.start_time.format("%Y-%m-%d %H:%M"),
            session.template.name,
            session.exercise_instances().len(),
            completed_sets
        );
    }
}

fn cmd_stats<S: Persistence>(gym: &Coordinator<S>) {
    let stats = gym.stats();
    println!("Total workouts:     {}", stats.total_workouts);
    println!(
        "Workouts per week:  {:.1} (last {} weeks)",
        stats.average_workouts_per_week,
        gym.config().analytics.stats_window_weeks
    );
    println!("Heaviest lift:      {:.1}kg", stats.heaviest_lift);
    println!("Longest streak:     {} days", stats.longest_streak);
}

fn cmd_frequency<S: Persistence>(gym: &Coordinator<S>, weeks: Option<u32>) {
    for week in gym.frequency(weeks) {
        println!(
            "  {}  {:>2} {}",
            week.week_start.format("%Y-%m-%d"),
            week.workout_count,
            "#".repeat(week.workout_count)
        );
    }
}

fn cmd_progression<S: Persistence>(
    gym: &Coordinator<S>,
    exercise: &str,
    metric: AnalyticsMetric,
    weeks: Option<u32>,
) -> Result<()> {
    let exercise = find_exercise(gym, exercise)?;
    let points = gym.progression(exercise, metric, weeks);
    if points.is_empty() {
        println!("No data for {} yet.", exercise.name);
    }
    for point in points {
        println!("  {}  {:.1}", point.date.format("%Y-%m-%d"), point.value);
    }
    Ok(())
}

fn cmd_export<S: Persistence>(
    gym: &Coordinator<S>,
    format: ExportFormat,
    out: &std::path::Path,
) -> Result<()> {
    match format {
        ExportFormat::Json => {
            let bundle = ExportBundle::new(gym.exercises(), gym.templates(), gym.history());
            export::write_json_bundle(&bundle, out)?;
        }
        ExportFormat::Csv => {
            export::write_history_csv(gym.history(), out)?;
        }
    }
    println!("✓ Exported to {}", out.display());
    Ok(())
}
