//! Table-driven SQL assembly for the four command kinds
//!
//! Each kind is described by a [`Shape`]: the columns it projects, which
//! country joins it needs, what it groups by and whether the user may pick
//! the country role. [`build`] turns a shape plus [`Options`] into a SELECT
//! AST and renders it.

use crate::{
    command::{
        CommandKind,
        options::{Options, Role, bar_count},
    },
    sql::parser::ast::{Consts, Expression, FromItem, JoinType, Statement},
};

/// Groups with this many bars or fewer are left out of aggregated results
pub const MIN_GROUP_SIZE: i64 = 4;

/// A projected column
#[derive(Debug, Clone, Copy)]
enum Column {
    BarName,
    Company,
    Rating,
    CocoaPercent,
    /// Country name of a fixed role
    CountryName(Role),
    /// Country name of the selected role
    RoleCountryName,
    /// Region of the selected role
    RoleRegion,
    /// The ORDER BY expression itself
    OrderKey,
}

#[derive(Debug, Clone, Copy)]
enum Joins {
    /// Both countries (A and B)
    Both,
    /// Only the country of the selected role
    Role,
}

#[derive(Debug, Clone, Copy)]
enum GroupKey {
    Company,
    RoleCountry,
    RoleRegion,
}

/// Per-kind query description
#[derive(Debug)]
struct Shape {
    columns: &'static [Column],
    joins: Joins,
    group_by: Option<GroupKey>,
    /// Whether `source` can move predicates and grouping to the origin role
    role_selectable: bool,
}

const BARS: Shape = Shape {
    columns: &[
        Column::BarName,
        Column::Company,
        Column::CountryName(Role::Home),
        Column::Rating,
        Column::CocoaPercent,
        Column::CountryName(Role::Origin),
    ],
    joins: Joins::Both,
    group_by: None,
    role_selectable: true,
};

const COMPANIES: Shape = Shape {
    columns: &[Column::Company, Column::RoleCountryName, Column::OrderKey],
    joins: Joins::Role,
    group_by: Some(GroupKey::Company),
    role_selectable: false,
};

const COUNTRIES: Shape = Shape {
    columns: &[Column::RoleCountryName, Column::RoleRegion, Column::OrderKey],
    joins: Joins::Role,
    group_by: Some(GroupKey::RoleCountry),
    role_selectable: true,
};

const REGIONS: Shape = Shape {
    columns: &[Column::RoleRegion, Column::OrderKey],
    joins: Joins::Role,
    group_by: Some(GroupKey::RoleRegion),
    role_selectable: true,
};

impl CommandKind {
    fn shape(self) -> &'static Shape {
        match self {
            CommandKind::Bars => &BARS,
            CommandKind::Companies => &COMPANIES,
            CommandKind::Countries => &COUNTRIES,
            CommandKind::Regions => &REGIONS,
        }
    }

    /// Index of the result column holding the ORDER BY value
    pub fn order_column(self, options: &Options) -> usize {
        let columns = self.shape().columns;
        columns
            .iter()
            .position(|c| matches!(c, Column::OrderKey))
            .or_else(|| {
                let wanted = options.order_by.expression().to_string();
                columns
                    .iter()
                    .position(|c| column_expr(*c, Role::Home, options).to_string() == wanted)
            })
            .unwrap_or(0)
    }
}

fn column_expr(column: Column, role: Role, options: &Options) -> Expression {
    match column {
        Column::BarName => Expression::field("SpecificBeanBarName"),
        Column::Company => Expression::field("Company"),
        Column::Rating => Expression::field("Rating"),
        Column::CocoaPercent => Expression::field("CocoaPercent"),
        Column::CountryName(fixed) => Expression::qualified(fixed.alias(), "EnglishName"),
        Column::RoleCountryName => Expression::qualified(role.alias(), "EnglishName"),
        Column::RoleRegion => Expression::qualified(role.alias(), "Region"),
        Column::OrderKey => options.order_by.expression(),
    }
}

/// `LEFT JOIN Countries AS <alias> ON Bars.<fk> = <alias>.Id`
fn join_country(left: FromItem, role: Role) -> FromItem {
    FromItem::Join {
        left: Box::new(left),
        right: Box::new(FromItem::Table {
            name: "Countries".into(),
            alias: Some(role.alias().into()),
        }),
        join_type: JoinType::Left,
        predicate: Some(
            Expression::qualified("Bars", role.foreign_key())
                .equal(Expression::qualified(role.alias(), "Id")),
        ),
    }
}

/// Builds the SELECT statement for a command kind
pub fn build_statement(kind: CommandKind, options: &Options) -> Statement {
    let shape = kind.shape();
    let role = if shape.role_selectable {
        options.role
    } else {
        Role::Home
    };

    let bars = FromItem::Table {
        name: "Bars".into(),
        alias: None,
    };
    let from = match shape.joins {
        Joins::Both => join_country(join_country(bars, Role::Home), Role::Origin),
        Joins::Role => join_country(bars, role),
    };

    let where_clause = options.location.as_ref().map(|cond| {
        Expression::qualified(role.alias(), cond.field.column())
            .equal(Consts::String(cond.value.clone()).into())
    });

    let group_by = shape.group_by.map(|key| match key {
        GroupKey::Company => Expression::field("Company"),
        GroupKey::RoleCountry => Expression::qualified(role.alias(), "Id"),
        GroupKey::RoleRegion => Expression::qualified(role.alias(), "Region"),
    });
    let having = group_by
        .as_ref()
        .map(|_| bar_count().greater_than(Consts::Integer(MIN_GROUP_SIZE).into()));
    let limit = i64::try_from(options.num_result).unwrap_or(i64::MAX);

    Statement::Select {
        select: shape
            .columns
            .iter()
            .map(|c| (column_expr(*c, role, options), None))
            .collect(),
        from,
        where_clause,
        group_by,
        having,
        order_by: vec![(options.order_by.expression(), options.sort)],
        limit: Some(Consts::Integer(limit).into()),
        offset: None,
    }
}

/// Builds the SQL text for a command kind
pub fn build(kind: CommandKind, options: &Options) -> String {
    build_statement(kind, options).to_string()
}

#[cfg(test)]
mod tests {
    use super::build;
    use crate::{
        command::{CommandKind, options::Options},
        error::Result,
        sql::parser::Parser,
    };

    fn sql(kind: CommandKind, tokens: &[&str]) -> Result<String> {
        Ok(build(kind, &Options::parse(kind, tokens)?))
    }

    #[test]
    fn test_bars_default() -> Result<()> {
        assert_eq!(
            sql(CommandKind::Bars, &[])?,
            "SELECT SpecificBeanBarName, Company, A.EnglishName, Rating, CocoaPercent, \
             B.EnglishName FROM Bars LEFT JOIN Countries AS A ON Bars.CompanyLocationId = A.Id \
             LEFT JOIN Countries AS B ON Bars.BroadBeanOriginId = B.Id \
             ORDER BY Rating DESC LIMIT 10"
        );
        Ok(())
    }

    #[test]
    fn test_bars_country_source() -> Result<()> {
        assert_eq!(
            sql(CommandKind::Bars, &["country=BR", "source", "ratings", "bottom", "8"])?,
            "SELECT SpecificBeanBarName, Company, A.EnglishName, Rating, CocoaPercent, \
             B.EnglishName FROM Bars LEFT JOIN Countries AS A ON Bars.CompanyLocationId = A.Id \
             LEFT JOIN Countries AS B ON Bars.BroadBeanOriginId = B.Id \
             WHERE B.Alpha2 = 'BR' ORDER BY Rating ASC LIMIT 8"
        );
        Ok(())
    }

    #[test]
    fn test_bars_region_sell_cocoa() -> Result<()> {
        let query = sql(CommandKind::Bars, &["region=Europe", "sell", "cocoa", "top", "3"])?;
        assert!(query.contains("WHERE A.Region = 'Europe'"));
        assert!(query.ends_with("ORDER BY CocoaPercent DESC LIMIT 3"));
        assert!(!query.contains("GROUP BY"));
        Ok(())
    }

    #[test]
    fn test_companies() -> Result<()> {
        assert_eq!(
            sql(CommandKind::Companies, &["cocoa", "5"])?,
            "SELECT Company, A.EnglishName, AVG(CocoaPercent) \
             FROM Bars LEFT JOIN Countries AS A ON Bars.CompanyLocationId = A.Id \
             GROUP BY Company HAVING COUNT(SpecificBeanBarName) > 4 \
             ORDER BY AVG(CocoaPercent) DESC LIMIT 5"
        );
        let query = sql(CommandKind::Companies, &["country=BE", "number_of_bars"])?;
        assert!(query.contains("WHERE A.Alpha2 = 'BE'"));
        assert!(query.contains("ORDER BY COUNT(SpecificBeanBarName) DESC"));
        Ok(())
    }

    #[test]
    fn test_countries() -> Result<()> {
        assert_eq!(
            sql(CommandKind::Countries, &["region=Americas", "source", "bottom"])?,
            "SELECT B.EnglishName, B.Region, AVG(Rating) \
             FROM Bars LEFT JOIN Countries AS B ON Bars.BroadBeanOriginId = B.Id \
             WHERE B.Region = 'Americas' \
             GROUP BY B.Id HAVING COUNT(SpecificBeanBarName) > 4 \
             ORDER BY AVG(Rating) ASC LIMIT 10"
        );
        Ok(())
    }

    #[test]
    fn test_regions() -> Result<()> {
        assert_eq!(
            sql(CommandKind::Regions, &["source", "number_of_bars"])?,
            "SELECT B.Region, COUNT(SpecificBeanBarName) \
             FROM Bars LEFT JOIN Countries AS B ON Bars.BroadBeanOriginId = B.Id \
             GROUP BY B.Region HAVING COUNT(SpecificBeanBarName) > 4 \
             ORDER BY COUNT(SpecificBeanBarName) DESC LIMIT 10"
        );
        assert!(!sql(CommandKind::Regions, &[])?.contains("WHERE"));
        Ok(())
    }

    #[test]
    fn test_group_filter_only_for_aggregates() -> Result<()> {
        for kind in [CommandKind::Companies, CommandKind::Countries, CommandKind::Regions] {
            assert!(sql(kind, &[])?.contains("HAVING COUNT(SpecificBeanBarName) > 4"));
        }
        let bars = sql(CommandKind::Bars, &["source", "cocoa"])?;
        assert!(!bars.contains("GROUP BY") && !bars.contains("HAVING"));
        Ok(())
    }

    #[test]
    fn test_emitted_sql_parses() -> Result<()> {
        let commands: [(CommandKind, &[&str]); 6] = [
            (CommandKind::Bars, &["country=BR", "source", "bottom", "8"]),
            (CommandKind::Bars, &["region=Europe", "cocoa"]),
            (CommandKind::Companies, &["region=Europe", "number_of_bars", "0"]),
            (CommandKind::Countries, &["source", "cocoa", "bottom"]),
            (CommandKind::Regions, &["number_of_bars", "top", "barplot"]),
            (CommandKind::Regions, &[]),
        ];
        for (kind, tokens) in commands {
            let text = sql(kind, tokens)?;
            Parser::new(&text).parse()?;
        }
        Ok(())
    }

    #[test]
    fn test_order_column() -> Result<()> {
        let column = |kind: CommandKind, tokens: &[&str]| -> Result<usize> {
            Ok(kind.order_column(&Options::parse(kind, tokens)?))
        };
        assert_eq!(column(CommandKind::Bars, &[])?, 3);
        assert_eq!(column(CommandKind::Bars, &["cocoa"])?, 4);
        assert_eq!(column(CommandKind::Companies, &[])?, 2);
        assert_eq!(column(CommandKind::Regions, &[])?, 1);
        Ok(())
    }

    #[test]
    fn test_large_limit() -> Result<()> {
        let query = sql(CommandKind::Regions, &["123456789012345678901234567890"])?;
        assert!(query.ends_with("LIMIT 9223372036854775807"));
        Parser::new(&query).parse()?;
        Ok(())
    }

    #[test]
    fn test_quoted_location_value() -> Result<()> {
        let query = sql(CommandKind::Bars, &["country=D'X", "source"])?;
        assert!(query.contains("WHERE B.Alpha2 = 'D''X'"));
        Parser::new(&query).parse()?;
        Ok(())
    }
}
