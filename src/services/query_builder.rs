//! Composes visibility / ownership / filter predicates for image listings.
//!
//! Every gallery listing goes through [`ImageQuery::for_listing`], so the
//! rule that anonymous callers only ever see public images lives in one place.

use crate::models::{identity::Identity, image::Visibility};
use sqlx::{QueryBuilder, Sqlite};
use std::{collections::BTreeMap, str::FromStr};

const PHOTO_FORMATS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
const VECTOR_FORMATS: [&str; 3] = ["svg", "ai", "eps"];

/// Filterable / sortable image columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Owner,
    Visibility,
    Format,
    Title,
    CreatedAt,
    Size,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Owner => "owner_id",
            Field::Visibility => "visibility",
            Field::Format => "format",
            Field::Title => "title",
            Field::CreatedAt => "created_at",
            Field::Size => "size_bytes",
        }
    }
}

/// A single-field condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq(String),
    In(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Field(Field, Condition),
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: Field, value: impl Into<String>) -> Self {
        Predicate::Field(field, Condition::Eq(value.into()))
    }

    fn push_sql(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Predicate::Field(field, Condition::Eq(value)) => {
                builder.push(field.column());
                builder.push(" = ");
                builder.push_bind(value.clone());
            }
            Predicate::Field(_, Condition::In(values)) if values.is_empty() => {
                builder.push("0 = 1");
            }
            Predicate::Field(field, Condition::In(values)) => {
                builder.push(field.column());
                builder.push(" IN (");
                let mut list = builder.separated(", ");
                for value in values {
                    list.push_bind(value.clone());
                }
                list.push_unseparated(")");
            }
            Predicate::Or(parts) => push_group(builder, parts, " OR ", "0 = 1"),
            Predicate::And(parts) => push_group(builder, parts, " AND ", "1 = 1"),
        }
    }
}

fn push_group(
    builder: &mut QueryBuilder<'_, Sqlite>,
    parts: &[Predicate],
    joiner: &str,
    empty: &str,
) {
    match parts {
        [] => {
            builder.push(empty);
        }
        [only] => only.push_sql(builder),
        _ => {
            builder.push("(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    builder.push(joiner);
                }
                part.push_sql(builder);
            }
            builder.push(")");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ImageFilter {
    #[default]
    All,
    Public,
    Private,
    Recent,
    Photos,
    Vectors,
}

impl FromStr for ImageFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(ImageFilter::All),
            "public" => Ok(ImageFilter::Public),
            "private" => Ok(ImageFilter::Private),
            "recent" => Ok(ImageFilter::Recent),
            "photos" => Ok(ImageFilter::Photos),
            "vectors" => Ok(ImageFilter::Vectors),
            other => Err(format!("unknown filter `{}`", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ImageSort {
    #[default]
    Newest,
    Oldest,
    TitleAsc,
    TitleDesc,
    Largest,
    Smallest,
}

impl ImageSort {
    pub fn order(&self) -> (Field, SortDirection) {
        match self {
            ImageSort::Newest => (Field::CreatedAt, SortDirection::Desc),
            ImageSort::Oldest => (Field::CreatedAt, SortDirection::Asc),
            ImageSort::TitleAsc => (Field::Title, SortDirection::Asc),
            ImageSort::TitleDesc => (Field::Title, SortDirection::Desc),
            ImageSort::Largest => (Field::Size, SortDirection::Desc),
            ImageSort::Smallest => (Field::Size, SortDirection::Asc),
        }
    }
}

impl FromStr for ImageSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(ImageSort::Newest),
            "oldest" => Ok(ImageSort::Oldest),
            "a-z" => Ok(ImageSort::TitleAsc),
            "z-a" => Ok(ImageSort::TitleDesc),
            "largest" => Ok(ImageSort::Largest),
            "smallest" => Ok(ImageSort::Smallest),
            other => Err(format!("unknown sort `{}`", other)),
        }
    }
}

/// A composed listing query: one predicate plus a sort order.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageQuery {
    pub predicate: Predicate,
    pub sort: (Field, SortDirection),
}

impl ImageQuery {
    /// Apply the fixed listing rules for `identity`, `filter` and `sort`.
    pub fn for_listing(identity: Option<&Identity>, filter: ImageFilter, sort: ImageSort) -> Self {
        let public = Visibility::Public.as_str();
        let mut builder = ImageQueryBuilder::new().sort(sort);

        builder = match identity {
            Some(who) => builder.or_group(vec![
                Predicate::eq(Field::Owner, who.id.as_str()),
                Predicate::eq(Field::Visibility, public),
            ]),
            None => builder.add_condition(Field::Visibility, Condition::Eq(public.into())),
        };

        builder = match (filter, identity) {
            (ImageFilter::All, _) => builder,
            (ImageFilter::Public, _) => {
                builder.add_condition(Field::Visibility, Condition::Eq(public.into()))
            }
            (ImageFilter::Private, Some(who)) => builder
                .add_condition(
                    Field::Visibility,
                    Condition::Eq(Visibility::Private.as_str().into()),
                )
                .add_condition(Field::Owner, Condition::Eq(who.id.clone())),
            (ImageFilter::Recent, Some(who)) => {
                builder.add_condition(Field::Owner, Condition::Eq(who.id.clone()))
            }
            (ImageFilter::Private | ImageFilter::Recent, None) => builder,
            (ImageFilter::Photos, _) => builder.add_condition(Field::Format, formats(&PHOTO_FORMATS)),
            (ImageFilter::Vectors, _) => {
                builder.add_condition(Field::Format, formats(&VECTOR_FORMATS))
            }
        };

        builder.build()
    }

    /// Append the predicate (no leading `WHERE`).
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        self.predicate.push_sql(builder);
    }

    /// Append the `ORDER BY` clause. `id` breaks ties deterministically.
    pub fn push_order_by(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        let (field, direction) = self.sort;
        builder.push(" ORDER BY ");
        builder.push(field.column());
        builder.push(" ");
        builder.push(direction.sql());
        builder.push(", id ASC");
    }
}

fn formats(list: &[&str]) -> Condition {
    Condition::In(list.iter().map(|f| f.to_string()).collect())
}

/// Incrementally composes an [`ImageQuery`].
///
/// Single-field conditions overwrite any earlier condition on the same
/// field. `or_group` / `and_group` accumulate.
#[derive(Clone, Debug, Default)]
pub struct ImageQueryBuilder {
    conditions: BTreeMap<Field, Condition>,
    groups: Vec<Predicate>,
    sort: ImageSort,
}

impl ImageQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_condition(mut self, field: Field, condition: Condition) -> Self {
        self.conditions.insert(field, condition);
        self
    }

    pub fn or_group(mut self, parts: Vec<Predicate>) -> Self {
        self.groups.push(Predicate::Or(parts));
        self
    }

    pub fn and_group(mut self, parts: Vec<Predicate>) -> Self {
        self.groups.push(Predicate::And(parts));
        self
    }

    pub fn sort(mut self, sort: ImageSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn build(&self) -> ImageQuery {
        let mut parts = self.groups.clone();
        parts.extend(
            self.conditions
                .iter()
                .map(|(field, condition)| Predicate::Field(*field, condition.clone())),
        );
        ImageQuery {
            predicate: Predicate::And(parts),
            sort: self.sort.order(),
        }
    }
}
