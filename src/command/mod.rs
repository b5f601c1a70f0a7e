//! Token command language
//!
//! A command line is `<kind> <option>*`, e.g. `bars country=BR source 8`.
//! The kind picks a query shape, the options are folded into an
//! [`Options`] record, and the builder renders the resulting SELECT.

use std::{fmt::Display, str::FromStr};

use crate::{
    error::{Error, Result},
    sql::{
        engine::{Engine, Session},
        executor::ResultSet,
    },
};

pub mod builder;
pub mod options;

use options::Options;

/// The first token of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Individual bars
    Bars,
    /// Bars grouped by manufacturer
    Companies,
    /// Bars grouped by country (company location or bean origin)
    Countries,
    /// Bars grouped by region
    Regions,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Bars => "bars",
            CommandKind::Companies => "companies",
            CommandKind::Countries => "countries",
            CommandKind::Regions => "regions",
        }
    }
}

impl FromStr for CommandKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bars" => Ok(CommandKind::Bars),
            "companies" => Ok(CommandKind::Companies),
            "countries" => Ok(CommandKind::Countries),
            "regions" => Ok(CommandKind::Regions),
            _ => Err(Error::InvalidCommand(s.to_string())),
        }
    }
}

impl Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub options: Options,
    /// `barplot` appeared among the options
    pub barplot: bool,
}

impl Command {
    /// Splits a line on whitespace and parses kind and options
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let kind: CommandKind = tokens
            .next()
            .ok_or_else(|| Error::InvalidCommand(String::new()))?
            .parse()?;
        let tokens = tokens.collect::<Vec<_>>();
        Ok(Self {
            kind,
            options: Options::parse(kind, &tokens)?,
            barplot: tokens.contains(&"barplot"),
        })
    }

    pub fn to_sql(&self) -> String {
        builder::build(self.kind, &self.options)
    }

    /// Result column plotted by `barplot`: the ORDER BY value
    pub fn chart_column(&self) -> usize {
        self.kind.order_column(&self.options)
    }
}

/// Compiles a command line into SQL text
pub fn compile(line: &str) -> Result<String> {
    Ok(Command::parse(line)?.to_sql())
}

/// Compiles a command line and runs it in the session
pub fn process_command<E: Engine + 'static>(
    session: &mut Session<E>,
    line: &str,
) -> Result<ResultSet> {
    session.execute(&compile(line)?)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Command, CommandKind, compile, process_command};
    use crate::{
        dataset,
        error::{Error, Result},
        sql::{
            engine::{Engine, Session, kv::KVEngine},
            types::Value,
        },
        storage::memory::MemoryEngine,
    };

    fn session() -> Result<Session<KVEngine<MemoryEngine>>> {
        let engine = KVEngine::new(MemoryEngine::new());
        dataset::load(&engine, &Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))?;
        engine.session()
    }

    fn text(value: &Value) -> String {
        value.to_string()
    }

    fn number(value: &Value) -> f64 {
        value.as_f64().unwrap_or(f64::NAN)
    }

    #[test]
    fn test_parse_command() -> Result<()> {
        let command = Command::parse("  regions   source number_of_bars barplot ")?;
        assert_eq!(command.kind, CommandKind::Regions);
        assert!(command.barplot);
        assert_eq!(command.chart_column(), 1);

        let command = Command::parse("bars cocoa")?;
        assert!(!command.barplot);
        assert_eq!(command.chart_column(), 4);
        Ok(())
    }

    #[test]
    fn test_invalid_command() {
        assert_eq!(
            Command::parse("chocolates 5"),
            Err(Error::InvalidCommand("chocolates".into()))
        );
        assert_eq!(Command::parse("Bars"), Err(Error::InvalidCommand("Bars".into())));
        assert_eq!(Command::parse(""), Err(Error::InvalidCommand(String::new())));
        assert_eq!(Command::parse("   "), Err(Error::InvalidCommand(String::new())));
    }

    #[test]
    fn test_unrecognized_option() {
        assert_eq!(
            compile("bars country=BR sourc"),
            Err(Error::UnrecognizedOption("sourc".into()))
        );
        assert_eq!(
            compile("regions region=Europe"),
            Err(Error::UnrecognizedOption("region=Europe".into()))
        );
    }

    #[test]
    fn test_compile() -> Result<()> {
        assert_eq!(
            compile("bars country=BR source ratings bottom 8")?,
            "SELECT SpecificBeanBarName, Company, A.EnglishName, Rating, CocoaPercent, \
             B.EnglishName FROM Bars LEFT JOIN Countries AS A ON Bars.CompanyLocationId = A.Id \
             LEFT JOIN Countries AS B ON Bars.BroadBeanOriginId = B.Id \
             WHERE B.Alpha2 = 'BR' ORDER BY Rating ASC LIMIT 8"
        );
        assert_eq!(compile("companies cocoa 5")?, compile("companies 5 cocoa top")?);
        Ok(())
    }

    #[test]
    fn test_run_bars() -> Result<()> {
        let mut session = session()?;
        let result = process_command(&mut session, "bars country=BR source bottom 8")?;
        assert_eq!(result.columns.len(), 6);
        assert_eq!(result.len(), 2);
        assert!(result.rows.iter().all(|row| text(&row[5]) == "Brazil"));
        assert_eq!(text(&result.rows[0][0]), "Bahia");
        assert!(number(&result.rows[0][3]) <= number(&result.rows[1][3]));

        let result = process_command(&mut session, "bars 3")?;
        assert_eq!(result.len(), 3);
        assert!(result.rows.windows(2).all(|w| number(&w[0][3]) >= number(&w[1][3])));

        assert!(process_command(&mut session, "bars 0")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_run_aggregates() -> Result<()> {
        let mut session = session()?;

        let result = process_command(&mut session, "companies number_of_bars")?;
        assert_eq!(result.len(), 4);
        assert_eq!(text(&result.rows[0][0]), "Dandelion");
        assert!(result.rows.iter().all(|row| number(&row[2]) > 4.0));
        assert!(result.rows.windows(2).all(|w| number(&w[0][2]) >= number(&w[1][2])));

        let result = process_command(&mut session, "countries region=Europe")?;
        assert_eq!(result.len(), 1);
        assert_eq!(text(&result.rows[0][0]), "France");

        let result = process_command(&mut session, "countries source cocoa bottom 1")?;
        assert_eq!(result.len(), 1);

        let result = process_command(&mut session, "regions")?;
        let regions = result.rows.iter().map(|row| text(&row[0])).collect::<Vec<_>>();
        assert_eq!(regions.len(), 2);
        assert!(regions.contains(&"Europe".to_string()));
        assert!(regions.contains(&"Americas".to_string()));
        Ok(())
    }

    #[test]
    fn test_session_usable_after_error() -> Result<()> {
        let mut session = session()?;
        assert!(process_command(&mut session, "bars sell cocoa=5").is_err());
        assert!(session.execute("SELECT Nothing FROM Bars").is_err());
        assert_eq!(process_command(&mut session, "regions source 2")?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_run_unusual_values() -> Result<()> {
        let mut session = session()?;
        assert!(process_command(&mut session, "bars country=D'X source")?.is_empty());
        assert!(process_command(&mut session, "countries region=")?.is_empty());

        let result = process_command(&mut session, "regions source 99999999999999999999")?;
        assert_eq!(result.len(), 3);
        Ok(())
    }
}
