//! Interactive form session.
//!
//! A line-oriented stand-in for the single-page form: the user sets fields,
//! clears them, flips between the home and about pages and asks for a
//! prediction. All state lives in one [`FormSession`] value owned by the
//! loop in [`run`].

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::config::FormConfig;
use crate::models::{CategoricalName, NumericField, NumericName, PredictionResult};
use crate::pipeline::{validate_numeric, FormInput, PriceService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Home,
    About,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Numeric(NumericName),
    Categorical(CategoricalName),
}

impl Field {
    fn parse(s: &str) -> Option<Self> {
        let s = s.to_ascii_lowercase();
        NumericName::from_str(&s)
            .map(Self::Numeric)
            .or_else(|| CategoricalName::from_str(&s).map(Self::Categorical))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set(Field, String),
    Clear(NumericName),
    Predict,
    Home,
    About,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}', type 'help' for a list")]
    UnknownCommand(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match word.to_ascii_lowercase().as_str() {
            "set" => {
                let (name, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(CommandError::Usage("set <field> <value>"))?;
                let field =
                    Field::parse(name).ok_or_else(|| CommandError::UnknownField(name.to_string()))?;
                Ok(Self::Set(field, value.trim().to_string()))
            }
            "clear" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("clear <numeric field>"));
                }
                match Field::parse(rest) {
                    Some(Field::Numeric(name)) => Ok(Self::Clear(name)),
                    _ => Err(CommandError::UnknownField(rest.to_string())),
                }
            }
            "predict" => Ok(Self::Predict),
            "home" => Ok(Self::Home),
            "about" => Ok(Self::About),
            "show" | "" => Ok(Self::Show),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(CommandError::UnknownCommand(word.to_string())),
        }
    }
}

const HELP: &[&str] = &[
    "Commands:",
    "  set <field> <value>   fill a field (carat, depth, table, x, y, z, cut, color, clarity)",
    "  clear <field>         empty a numeric field",
    "  predict               estimate the price",
    "  home | about          switch page",
    "  show                  redraw the current page",
    "  quit                  leave",
];

/// State of one interactive form.
#[derive(Debug, Clone)]
pub struct FormSession {
    page: Page,
    input: FormInput,
    last_result: Option<PredictionResult>,
}

impl FormSession {
    /// Start on the home page with empty numeric fields and each selection
    /// on its first choice.
    pub fn new(form: &FormConfig) -> Self {
        let mut input = FormInput::default();
        for name in CategoricalName::ALL {
            if let Some(first) = form.choices(name).first() {
                *input.selection_mut(name) = first.clone();
            }
        }
        Self {
            page: Page::Home,
            input,
            last_result: None,
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn input(&self) -> &FormInput {
        &self.input
    }

    /// The most recent successful prediction.
    pub fn last_result(&self) -> Option<&PredictionResult> {
        self.last_result.as_ref()
    }

    /// Apply one command and return the lines to display.
    pub fn apply(&mut self, service: &PriceService, command: Command) -> Vec<String> {
        match command {
            Command::Set(Field::Numeric(name), value) => {
                let field = NumericField::new(name, &value, service.form().bounds(name));
                let lines = match validate_numeric(&field) {
                    Ok(_) => Vec::new(),
                    Err(e) => vec![format!("warning: {}", e)],
                };
                *self.input.numeric_mut(name) = value;
                lines
            }
            Command::Set(Field::Categorical(name), value) => {
                let choices = service.form().choices(name);
                match choices.iter().find(|c| c.eq_ignore_ascii_case(&value)) {
                    Some(choice) => {
                        *self.input.selection_mut(name) = choice.clone();
                        Vec::new()
                    }
                    None => vec![format!(
                        "'{}' is not a valid {}; choose one of: {}",
                        value,
                        name,
                        choices.join(", ")
                    )],
                }
            }
            Command::Clear(name) => {
                self.input.numeric_mut(name).clear();
                Vec::new()
            }
            Command::Predict => self.predict(service),
            Command::Home => {
                self.page = Page::Home;
                self.render(service)
            }
            Command::About => {
                self.page = Page::About;
                self.render(service)
            }
            Command::Show => self.render(service),
            Command::Help => HELP.iter().map(|s| s.to_string()).collect(),
            Command::Quit => Vec::new(),
        }
    }

    fn predict(&mut self, service: &PriceService) -> Vec<String> {
        if self.page != Page::Home {
            return vec!["Switch to the home page to predict.".to_string()];
        }

        let submission = service.submit(&self.input);
        let mut lines: Vec<String> = submission
            .warnings
            .iter()
            .map(|w| format!("warning: {}", w))
            .collect();

        match submission.outcome {
            Ok(result) => {
                lines.push(format!("Estimated price: {}", result.formatted));
                self.last_result = Some(result);
            }
            Err(e) => lines.push(format!("error: {}", e)),
        }
        lines
    }

    /// Draw the current page.
    pub fn render(&self, service: &PriceService) -> Vec<String> {
        match self.page {
            Page::Home => {
                let form = service.form();
                let mut lines = vec!["Diamond Price Predictor".to_string()];
                for name in CategoricalName::ALL {
                    lines.push(format!(
                        "  {:<8} {:<10} [{}]",
                        name.label(),
                        self.input.selection(name),
                        form.choices(name).join(", ")
                    ));
                }
                for name in NumericName::ALL {
                    lines.push(format!(
                        "  {:<8} {:<10} ({})",
                        name.label(),
                        self.input.numeric(name),
                        form.bounds(name)
                    ));
                }
                if let Some(result) = &self.last_result {
                    lines.push(format!("Estimated price: {}", result.formatted));
                }
                lines
            }
            Page::About => vec![
                "About".to_string(),
                "  Estimates a diamond's price from its carat, cut, color, clarity,".to_string(),
                "  depth, table and measured dimensions.".to_string(),
                format!("  Model: {}", service.description()),
            ],
        }
    }
}

/// Drive a session from line input until `quit` or end of input.
pub fn run<R: BufRead, W: Write>(service: &PriceService, input: R, mut output: W) -> io::Result<()> {
    let mut session = FormSession::new(service.form());

    for line in session.render(service) {
        writeln!(output, "{}", line)?;
    }
    writeln!(output, "Type 'help' for commands.")?;

    for line in input.lines() {
        let lines = match Command::parse(&line?) {
            Ok(Command::Quit) => break,
            Ok(command) => session.apply(service, command),
            Err(e) => vec![e.to_string()],
        };
        for line in lines {
            writeln!(output, "{}", line)?;
        }
        output.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{Features, ModelError, PriceModel};
    use crate::models::DiamondRecord;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Prices at `carat * 1000` until told to fail.
    #[derive(Default)]
    struct SwitchModel {
        broken: AtomicBool,
    }

    impl PriceModel for SwitchModel {
        fn transform(&self, record: &DiamondRecord) -> Result<Features, ModelError> {
            Ok(Features::new(vec![record.carat]))
        }

        fn predict(&self, features: &Features) -> Result<f64, ModelError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(ModelError::Runtime("incompatible transformer state".to_string()));
            }
            Ok(features.as_slice()[0] * 1000.0)
        }
    }

    fn filled(session: &mut FormSession, service: &PriceService) {
        for line in [
            "set carat 1.5",
            "set depth 61",
            "set table 57",
            "set x 6",
            "set y 6",
            "set z 4",
        ] {
            session.apply(service, Command::parse(line).unwrap());
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::parse("set cut Very Good"),
            Ok(Command::Set(
                Field::Categorical(CategoricalName::Cut),
                "Very Good".to_string()
            ))
        );
        assert_eq!(
            Command::parse("SET Carat  1.2 "),
            Ok(Command::Set(Field::Numeric(NumericName::Carat), "1.2".to_string()))
        );
        assert_eq!(Command::parse("clear z"), Ok(Command::Clear(NumericName::Z)));
        assert_eq!(Command::parse("about"), Ok(Command::About));
        assert!(matches!(
            Command::parse("clear cut"),
            Err(CommandError::UnknownField(_))
        ));
        assert!(matches!(
            Command::parse("set carat"),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!(
            Command::parse("dance"),
            Err(CommandError::UnknownCommand(_))
        ));
    }

    #[test]
    fn new_session_selects_first_choices() {
        let session = FormSession::new(&FormConfig::default());
        assert_eq!(session.page(), Page::Home);
        assert_eq!(session.input().cut, "Fair");
        assert_eq!(session.input().color, "D");
        assert_eq!(session.input().clarity, "I1");
        assert_eq!(session.input().carat, "");
    }

    #[test]
    fn failed_prediction_keeps_previous_result() {
        let model = Arc::new(SwitchModel::default());
        let service = PriceService::new(model.clone(), FormConfig::default(), false);
        let mut session = FormSession::new(service.form());
        filled(&mut session, &service);

        let lines = session.apply(&service, Command::Predict);
        assert_eq!(lines, vec!["Estimated price: $1,500.00".to_string()]);

        model.broken.store(true, Ordering::SeqCst);
        let lines = session.apply(&service, Command::Predict);
        assert_eq!(
            lines,
            vec!["error: Prediction failed: incompatible transformer state".to_string()]
        );
        assert_eq!(session.last_result().unwrap().formatted, "$1,500.00");
    }

    #[test]
    fn set_warns_about_bad_numbers_right_away() {
        let service = PriceService::new(
            Arc::new(SwitchModel::default()),
            FormConfig::default(),
            false,
        );
        let mut session = FormSession::new(service.form());

        let lines = session.apply(&service, Command::parse("set depth 80").unwrap());
        assert_eq!(lines, vec!["warning: Depth must be between 50 and 70, got 80".to_string()]);
        assert_eq!(session.input().depth, "80");

        let lines = session.apply(&service, Command::parse("set depth 62").unwrap());
        assert!(lines.is_empty());
    }

    #[test]
    fn clear_empties_a_field() {
        let service = PriceService::new(
            Arc::new(SwitchModel::default()),
            FormConfig::default(),
            false,
        );
        let mut session = FormSession::new(service.form());
        filled(&mut session, &service);
        session.apply(&service, Command::Clear(NumericName::Y));

        let lines = session.apply(&service, Command::Predict);
        assert_eq!(
            lines,
            vec!["error: Please enter valid values for all fields (missing: Y)".to_string()]
        );
        assert!(session.last_result().is_none());
    }

    #[test]
    fn selection_outside_choices_is_refused() {
        let service = PriceService::new(
            Arc::new(SwitchModel::default()),
            FormConfig::default(),
            false,
        );
        let mut session = FormSession::new(service.form());

        let lines = session.apply(&service, Command::parse("set color Z").unwrap());
        assert_eq!(lines.len(), 1);
        assert_eq!(session.input().color, "D");

        session.apply(&service, Command::parse("set color g").unwrap());
        assert_eq!(session.input().color, "G");
    }

    #[test]
    fn predict_only_runs_on_home_page() {
        let service = PriceService::new(
            Arc::new(SwitchModel::default()),
            FormConfig::default(),
            false,
        );
        let mut session = FormSession::new(service.form());
        filled(&mut session, &service);

        let about = session.apply(&service, Command::About);
        assert_eq!(about[0], "About");
        assert_eq!(session.page(), Page::About);

        let lines = session.apply(&service, Command::Predict);
        assert_eq!(lines, vec!["Switch to the home page to predict.".to_string()]);
        assert!(session.last_result().is_none());

        session.apply(&service, Command::Home);
        session.apply(&service, Command::Predict);
        assert!(session.last_result().is_some());
    }

    #[test]
    fn run_processes_lines_until_quit() {
        let service = PriceService::new(
            Arc::new(SwitchModel::default()),
            FormConfig::default(),
            false,
        );
        let script = "set carat 2\nset depth 60\nset table 55\nset x 5\nset y 5\nset z 3\npredict\nquit\nset carat 3\n";
        let mut out = Vec::new();
        run(&service, script.as_bytes(), &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Estimated price: $2,000.00"));
        assert!(!out.contains("$3,000.00"));
    }
}
