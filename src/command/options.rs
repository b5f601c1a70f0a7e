use crate::{
    command::CommandKind,
    error::{Error, Result},
    sql::parser::ast::{Expression, OrderDirection},
};

/// Column expression a query is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    /// Raw bar rating (`bars` only)
    Rating,
    /// Raw cocoa percentage (`bars` only)
    CocoaPercent,
    AvgRating,
    AvgCocoaPercent,
    /// Number of bars in the group (never for `bars`)
    BarCount,
}

impl OrderBy {
    pub fn expression(self) -> Expression {
        match self {
            OrderBy::Rating => Expression::field("Rating"),
            OrderBy::CocoaPercent => Expression::field("CocoaPercent"),
            OrderBy::AvgRating => Expression::function("AVG", Expression::field("Rating")),
            OrderBy::AvgCocoaPercent => {
                Expression::function("AVG", Expression::field("CocoaPercent"))
            }
            OrderBy::BarCount => bar_count(),
        }
    }
}

/// `COUNT(SpecificBeanBarName)`, also used by the group-size filter
pub(crate) fn bar_count() -> Expression {
    Expression::function("COUNT", Expression::field("SpecificBeanBarName"))
}

/// Which of the two country joins a predicate or grouping applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Company location, joined as `A`
    Home,
    /// Broad bean origin, joined as `B`
    Origin,
}

impl Role {
    pub fn alias(self) -> &'static str {
        match self {
            Role::Home => "A",
            Role::Origin => "B",
        }
    }

    /// Foreign key column on `Bars` referencing the country of this role
    pub fn foreign_key(self) -> &'static str {
        match self {
            Role::Home => "CompanyLocationId",
            Role::Origin => "BroadBeanOriginId",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationField {
    Region,
    /// Two-letter country code
    Country,
}

impl LocationField {
    pub fn column(self) -> &'static str {
        match self {
            LocationField::Region => "Region",
            LocationField::Country => "Alpha2",
        }
    }
}

/// Equality condition on the region or country code of a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationCond {
    pub field: LocationField,
    pub value: String,
}

/// Query parameters for one command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub order_by: OrderBy,
    pub sort: OrderDirection,
    pub num_result: u64,
    pub location: Option<LocationCond>,
    pub role: Role,
}

impl Options {
    pub const DEFAULT_NUM_RESULT: u64 = 10;
    /// Largest limit a query can carry; longer digit runs are clamped to it
    pub const MAX_NUM_RESULT: u64 = i64::MAX as u64;

    /// Defaults for a command kind: top 10 by (average) rating, home role
    pub fn defaults(kind: CommandKind) -> Self {
        Self {
            order_by: match kind {
                CommandKind::Bars => OrderBy::Rating,
                _ => OrderBy::AvgRating,
            },
            sort: OrderDirection::Desc,
            num_result: Self::DEFAULT_NUM_RESULT,
            location: None,
            role: Role::Home,
        }
    }

    /// Folds option tokens over the defaults; later tokens overwrite earlier ones
    pub fn parse<S: AsRef<str>>(kind: CommandKind, tokens: &[S]) -> Result<Self> {
        tokens
            .iter()
            .try_fold(Self::defaults(kind), |options, token| {
                options.apply(kind, token.as_ref())
            })
    }

    /// Returns the options with one token's effect applied
    pub fn apply(self, kind: CommandKind, token: &str) -> Result<Self> {
        let unrecognized = || Error::UnrecognizedOption(token.to_string());
        Ok(match token {
            "bottom" => Self {
                sort: OrderDirection::Asc,
                ..self
            },
            "cocoa" => Self {
                order_by: match kind {
                    CommandKind::Bars => OrderBy::CocoaPercent,
                    _ => OrderBy::AvgCocoaPercent,
                },
                ..self
            },
            "number_of_bars" if kind != CommandKind::Bars => Self {
                order_by: OrderBy::BarCount,
                ..self
            },
            "source" if kind != CommandKind::Companies => Self {
                role: Role::Origin,
                ..self
            },
            // Accepted for readability; charts are triggered by the dispatcher
            "top" | "ratings" | "sell" | "barplot" => self,
            // Digits only, so parsing fails on overflow alone
            _ if is_number(token) => Self {
                num_result: token
                    .parse::<u64>()
                    .map_or(Self::MAX_NUM_RESULT, |n| n.min(Self::MAX_NUM_RESULT)),
                ..self
            },
            _ => match token.split_once('=') {
                Some((key, value)) => {
                    let field = match (key, kind) {
                        ("region", CommandKind::Regions) => return Err(unrecognized()),
                        ("region", _) => LocationField::Region,
                        ("country", CommandKind::Bars | CommandKind::Companies) => {
                            LocationField::Country
                        }
                        _ => return Err(unrecognized()),
                    };
                    Self {
                        location: Some(LocationCond {
                            field,
                            value: value.to_string(),
                        }),
                        ..self
                    }
                }
                None => return Err(unrecognized()),
            },
        })
    }
}

/// Non-empty run of ASCII decimal digits
fn is_number(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}
