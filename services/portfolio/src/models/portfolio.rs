//! Portfolio model: the content rendered into a user's public page

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::reconciliation::schema;

/// Portfolio entity, one per user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub template_id: i32,

    // Personal
    pub full_name: String,
    pub company_name: String,
    pub job_title: String,
    pub bio: String,
    pub profile_pic: String,
    pub resume_file: String,

    // Contact
    pub email: String,
    pub phone: String,
    pub linkedin_url: String,
    pub github_url: String,
    pub twitter_url: String,

    /// JSON-encoded list of skill names
    pub skills: String,

    // Projects
    pub project1_title: String,
    pub project1_desc: String,
    pub project1_link: String,
    pub project2_title: String,
    pub project2_desc: String,
    pub project2_link: String,
    pub project3_title: String,
    pub project3_desc: String,
    pub project3_link: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One of the three fixed project slots
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Project<'a> {
    pub title: &'a str,
    pub desc: &'a str,
    pub link: &'a str,
}

impl Portfolio {
    /// A portfolio with every field at its schema default
    pub fn with_defaults(user_id: Uuid, now: DateTime<Utc>) -> Self {
        let mut portfolio = Portfolio {
            id: Uuid::new_v4(),
            user_id,
            template_id: 0,
            full_name: String::new(),
            company_name: String::new(),
            job_title: String::new(),
            bio: String::new(),
            profile_pic: String::new(),
            resume_file: String::new(),
            email: String::new(),
            phone: String::new(),
            linkedin_url: String::new(),
            github_url: String::new(),
            twitter_url: String::new(),
            skills: String::new(),
            project1_title: String::new(),
            project1_desc: String::new(),
            project1_link: String::new(),
            project2_title: String::new(),
            project2_desc: String::new(),
            project2_link: String::new(),
            project3_title: String::new(),
            project3_desc: String::new(),
            project3_link: String::new(),
            created_at: now,
            updated_at: now,
        };

        for field in schema::FIELDS {
            field.reset(&mut portfolio);
        }

        portfolio
    }

    /// Decoded skill list; an undecodable value reads as empty
    pub fn skill_list(&self) -> Vec<String> {
        schema::decode_skills(&self.skills)
    }

    pub fn projects(&self) -> [Project<'_>; 3] {
        [
            Project {
                title: &self.project1_title,
                desc: &self.project1_desc,
                link: &self.project1_link,
            },
            Project {
                title: &self.project2_title,
                desc: &self.project2_desc,
                link: &self.project2_link,
            },
            Project {
                title: &self.project3_title,
                desc: &self.project3_desc,
                link: &self.project3_link,
            },
        ]
    }
}

/// A portfolio as handed to clients, with the skill list decoded
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PortfolioView {
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub skills_list: Vec<String>,
}

impl From<Portfolio> for PortfolioView {
    fn from(portfolio: Portfolio) -> Self {
        let skills_list = portfolio.skill_list();
        Self {
            portfolio,
            skills_list,
        }
    }
}
