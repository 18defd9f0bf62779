use std::error::Error;

use bytes::BytesMut;
use postgres_types::{to_sql_checked, FromSql, IsNull, ToSql, Type};

use crate::model::{ActivityId, BacklogId, PriorityId, ProjectId, RoleId, StateId, TrackerId, UserId, WorkId};
use crate::patch::FieldValue;

// Identifiers are int4 columns.
macro_rules! int4_id {
    ($($id:ty),*) => {
        $(
            impl ToSql for $id {
                fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> { self.0.to_sql(ty, out) }

                fn accepts(ty: &Type) -> bool { <i32 as ToSql>::accepts(ty) }

                to_sql_checked!();
            }

            impl<'a> FromSql<'a> for $id {
                fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> { Ok(Self(i32::from_sql(ty, raw)?)) }

                fn accepts(ty: &Type) -> bool { <i32 as FromSql>::accepts(ty) }
            }
        )*
    };
}

int4_id!(ProjectId, BacklogId, WorkId, UserId, RoleId, PriorityId, TrackerId, ActivityId, StateId);

// The column type is only known per variant, so the type check happens inside to_sql.
impl ToSql for FieldValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            FieldValue::Null => Ok(IsNull::Yes),
            FieldValue::Text(value) => value.to_sql_checked(ty, out),
            FieldValue::Int(value) => value.to_sql_checked(ty, out),
            FieldValue::Float(value) => value.to_sql_checked(ty, out),
            FieldValue::Timestamp(value) => value.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool { true }

    to_sql_checked!();
}
