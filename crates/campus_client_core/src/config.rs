use std::env;

/// Webhook endpoints of the external automation service, one per login page.
#[derive(Clone, Debug, PartialEq)]
pub struct LoginEndpoints {
    pub student: String,
    pub alumni: String,
    pub admin: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub login: LoginEndpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3001".to_string(),
            login: LoginEndpoints {
                student: "http://localhost:5678/webhook/student-login".to_string(),
                alumni: "http://localhost:5678/webhook/student-login".to_string(),
                admin: "http://localhost:5678/webhook/admin-login".to_string(),
            },
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let pick = |key: &str, fallback: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };

        Self {
            api_base_url: pick("CAMPUS_API_URL", defaults.api_base_url),
            login: LoginEndpoints {
                student: pick("CAMPUS_STUDENT_LOGIN_URL", defaults.login.student),
                alumni: pick("CAMPUS_ALUMNI_LOGIN_URL", defaults.login.alumni),
                admin: pick("CAMPUS_ADMIN_LOGIN_URL", defaults.login.admin),
            },
        }
    }
}
