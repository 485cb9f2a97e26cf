/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The named resource types of the Data API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    Activities,
    Channels,
    Comments,
    Contests,
    Groups,
    Locales,
    Playlists,
    Reports,
    Strongtags,
    Subtitles,
    Users,
    Videos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceAction {
    List,
    Get,
    Insert,
    Update,
    Delete,
}

/// How a resource type creates new entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStyle {
    NotSupported,
    /// POST the resource fields as a form body to a collection path
    Body,
    /// POST without a body to `<path>/<id>`, linking an existing resource
    Relation,
}

const ACTIVITY_FIELDS: &[&str] = &["id", "from_tile", "object_tile", "type"];
const CHANNEL_FIELDS: &[&str] = &["id", "description", "name"];
const COMMENT_FIELDS: &[&str] = &["id", "message", "owner"];
const NAMED_OWNED_FIELDS: &[&str] = &["id", "name", "owner"];
const REPORT_FIELDS: &[&str] = &["id"];
const STRONGTAG_FIELDS: &[&str] = &["id", "name"];
const SUBTITLE_FIELDS: &[&str] = &["id", "language", "url"];
const USER_FIELDS: &[&str] = &["id", "screenname"];
const VIDEO_FIELDS: &[&str] = &["id", "channel", "owner", "title"];
const LOCALE_FIELDS: &[&str] = &[
    "locale",
    "site_code",
    "language",
    "localized_language",
    "locally_localized_language",
    "country",
    "localized_country",
    "locally_localized_country",
    "currency",
];

impl ResourceType {
    /// Default collection listed when no path is given
    pub fn collection_path(self) -> &'static str {
        match self {
            ResourceType::Activities => "/activities",
            ResourceType::Channels => "/channels",
            ResourceType::Comments => "/comments",
            ResourceType::Contests => "/contests",
            ResourceType::Groups => "/groups",
            ResourceType::Locales => "/locales",
            ResourceType::Playlists => "/playlists",
            ResourceType::Reports => "/reports",
            ResourceType::Strongtags => "/strongtags",
            ResourceType::Subtitles => "/subtitles",
            ResourceType::Users => "/users",
            ResourceType::Videos => "/videos",
        }
    }

    /// Prefix addressing one resource by id, e.g. `/video`
    pub fn singular_path(self) -> Option<&'static str> {
        match self {
            ResourceType::Activities => Some("/activity"),
            ResourceType::Channels => Some("/channel"),
            ResourceType::Comments => Some("/comment"),
            ResourceType::Contests => Some("/contest"),
            ResourceType::Groups => Some("/group"),
            ResourceType::Locales => None,
            ResourceType::Playlists => Some("/playlist"),
            ResourceType::Reports => Some("/report"),
            ResourceType::Strongtags => Some("/strongtag"),
            ResourceType::Subtitles => Some("/subtitle"),
            ResourceType::Users => Some("/user"),
            ResourceType::Videos => Some("/video"),
        }
    }

    pub fn supports(self, action: ResourceAction) -> bool {
        match self {
            ResourceType::Locales => action == ResourceAction::List,
            ResourceType::Activities
            | ResourceType::Channels
            | ResourceType::Contests
            | ResourceType::Groups => {
                matches!(action, ResourceAction::List | ResourceAction::Get)
            }
            _ => true,
        }
    }

    pub fn insert_style(self) -> InsertStyle {
        match self {
            ResourceType::Users | ResourceType::Videos => InsertStyle::Relation,
            other if other.supports(ResourceAction::Insert) => InsertStyle::Body,
            _ => InsertStyle::NotSupported,
        }
    }

    /// Collection new resources are created in when the caller gives none
    pub fn default_insert_path(self) -> Option<&'static str> {
        match self {
            ResourceType::Playlists => Some("/me/playlists"),
            _ => None,
        }
    }

    /// Fields requested, and exposed by models, when the caller names none
    pub fn default_fields(self) -> &'static [&'static str] {
        match self {
            ResourceType::Activities => ACTIVITY_FIELDS,
            ResourceType::Channels => CHANNEL_FIELDS,
            ResourceType::Comments => COMMENT_FIELDS,
            ResourceType::Contests | ResourceType::Groups | ResourceType::Playlists => {
                NAMED_OWNED_FIELDS
            }
            ResourceType::Locales => LOCALE_FIELDS,
            ResourceType::Reports => REPORT_FIELDS,
            ResourceType::Strongtags => STRONGTAG_FIELDS,
            ResourceType::Subtitles => SUBTITLE_FIELDS,
            ResourceType::Users => USER_FIELDS,
            ResourceType::Videos => VIDEO_FIELDS,
        }
    }
}

/// OAuth2 permission scopes that can be requested at authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Scope {
    Email,
    Userinfo,
    ManageVideos,
    ManageComments,
    ManagePlaylists,
    ManageTiles,
    ManageSubscriptions,
    ManageFriends,
    ManageFavorites,
    ManageGroups,
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn every_type_lists_and_identifies_rows() {
        for kind in ResourceType::iter() {
            assert!(kind.supports(ResourceAction::List), "{kind}");
            assert!(kind.collection_path().starts_with('/'));
            if kind != ResourceType::Locales {
                assert_eq!(kind.default_fields().first(), Some(&"id"), "{kind}");
                assert!(kind.singular_path().is_some());
            }
        }
    }

    #[test]
    fn read_only_types() {
        assert!(!ResourceType::Locales.supports(ResourceAction::Get));
        assert!(ResourceType::Contests.supports(ResourceAction::Get));
        assert!(!ResourceType::Contests.supports(ResourceAction::Delete));
        assert_eq!(ResourceType::Channels.insert_style(), InsertStyle::NotSupported);
        assert_eq!(ResourceType::Videos.insert_style(), InsertStyle::Relation);
        assert_eq!(ResourceType::Comments.insert_style(), InsertStyle::Body);
    }

    #[test]
    fn names() {
        assert_eq!(ResourceType::Strongtags.to_string(), "strongtags");
        assert_eq!(ResourceType::from_str("videos").ok(), Some(ResourceType::Videos));
        assert_eq!(ResourceAction::Delete.to_string(), "delete");
        assert_eq!(Scope::ManageVideos.to_string(), "manage_videos");
    }
}
