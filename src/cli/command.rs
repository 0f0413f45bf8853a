//! REPL command line parsing. Pure; dispatch lives in [`super::repl`].

use thiserror::Error;

use crate::validation::{OngRegistrationForm, RegisterForm};

pub const HELP: &str = "\
Commands:
  login <email> <password>                    sign in
  register <email> <password> <role> [k=v]    sign up; role is ONG, COMPANY, VOLUNTEER or USER
                                              keys: first, last, org, cnpj, company, companyCnpj, phone
  register-ong org=.. cnpj=.. first=.. last=.. email=.. password=..
                                              register an organization and its administrator
  logout                                      end the session
  whoami                                      show the signed-in user
  policies                                    list the current user's policies
  open <path>                                 navigate to a page, applying its access rules
  volunteers [tag|all] [page]                 browse available volunteers (organizations)
  next | prev                                 move through the volunteer pages
  tags                                        list the tags volunteers can be filtered by
  profile                                     show your profile
  profile tag add|remove <tag>                edit your profile tags
  history | certificates                      your volunteering history and certificates
  stats <groupId>                             dashboard figures of a group
  projects <groupId> [page]                   projects of a group
  donations <groupId> [page]                  donations of a group and their total
  help                                        this text
  quit | exit                                 leave
Values with spaces go in double quotes.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}\nusage: {usage}")]
pub struct UsageError {
    pub message: String,
    pub usage: &'static str,
}

fn usage(message: impl Into<String>, usage: &'static str) -> UsageError {
    UsageError { message: message.into(), usage }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEdit {
    Add(String),
    Remove(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Register(RegisterForm),
    RegisterOng(OngRegistrationForm),
    Logout,
    WhoAmI,
    Policies,
    Open(String),
    Volunteers { tag: Option<String>, page: Option<u32> },
    NextPage,
    PreviousPage,
    Tags,
    Profile,
    ProfileTag(TagEdit),
    History,
    Certificates,
    Stats(i64),
    Projects { group: i64, page: u32 },
    Donations { group: i64, page: u32 },
    Help,
    Quit,
}

/// Split on whitespace, keeping double-quoted runs together.
pub fn tokenize(line: &str) -> Result<Vec<String>, UsageError> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    out.push(std::mem::take(&mut cur));
                    has_token = false;
                }
            }
            c => {
                cur.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err(usage("unterminated quote", "values with spaces go in double quotes"));
    }
    if has_token {
        out.push(cur);
    }
    Ok(out)
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, UsageError> {
    let tokens = tokenize(line)?;
    let Some((head, args)) = tokens.split_first() else {
        return Ok(None);
    };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "login" => match args {
            [email, password] => Command::Login { email: email.clone(), password: password.clone() },
            _ => return Err(usage("expected email and password", "login <email> <password>")),
        },
        "register" => Command::Register(parse_register(args)?),
        "register-ong" => Command::RegisterOng(parse_register_ong(args)?),
        "logout" => Command::Logout,
        "whoami" => Command::WhoAmI,
        "policies" => Command::Policies,
        "open" => match args {
            [path] => Command::Open(path.clone()),
            _ => return Err(usage("expected a path", "open <path>")),
        },
        "volunteers" => parse_volunteers(args)?,
        "next" => Command::NextPage,
        "prev" | "previous" => Command::PreviousPage,
        "tags" => Command::Tags,
        "profile" => match args {
            [] => Command::Profile,
            [t, op, tag] if t == "tag" && op == "add" => Command::ProfileTag(TagEdit::Add(tag.clone())),
            [t, op, tag] if t == "tag" && op == "remove" => Command::ProfileTag(TagEdit::Remove(tag.clone())),
            _ => return Err(usage("unknown profile action", "profile | profile tag add|remove <tag>")),
        },
        "history" => Command::History,
        "certificates" => Command::Certificates,
        "stats" => Command::Stats(group_arg(args, "stats <groupId>")?),
        "projects" => {
            let (group, page) = group_page_args(args, "projects <groupId> [page]")?;
            Command::Projects { group, page }
        }
        "donations" => {
            let (group, page) = group_page_args(args, "donations <groupId> [page]")?;
            Command::Donations { group, page }
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(usage(format!("unknown command '{}'", other), "help")),
    };
    Ok(Some(cmd))
}

fn key_values<'a>(args: &'a [String], u: &'static str) -> Result<Vec<(&'a str, &'a str)>, UsageError> {
    args.iter()
        .map(|a| a.split_once('=').ok_or_else(|| usage(format!("expected key=value, got '{}'", a), u)))
        .collect()
}

const REGISTER_USAGE: &str = "register <email> <password> <role> [first=.. last=.. org=.. cnpj=.. company=.. companyCnpj=.. phone=..]";

fn parse_register(args: &[String]) -> Result<RegisterForm, UsageError> {
    let [email, password, role, rest @ ..] = args else {
        return Err(usage("expected email, password and role", REGISTER_USAGE));
    };
    let mut form = RegisterForm::new(email, password, &role.to_ascii_uppercase());
    for (k, v) in key_values(rest, REGISTER_USAGE)? {
        let v = Some(v.to_string());
        match k {
            "first" => form.first_name = v,
            "last" => form.last_name = v,
            "org" => form.organization_name = v,
            "cnpj" => form.cnpj = v,
            "company" => form.company_name = v,
            "companyCnpj" => form.company_cnpj = v,
            "phone" => form.phone = v,
            other => return Err(usage(format!("unknown field '{}'", other), REGISTER_USAGE)),
        }
    }
    Ok(form)
}

const REGISTER_ONG_USAGE: &str = "register-ong org=.. cnpj=.. first=.. last=.. email=.. password=..";

fn parse_register_ong(args: &[String]) -> Result<OngRegistrationForm, UsageError> {
    let mut form = OngRegistrationForm::default();
    for (k, v) in key_values(args, REGISTER_ONG_USAGE)? {
        let v = v.to_string();
        match k {
            "org" => form.organization_name = v,
            "cnpj" => form.cnpj = v,
            "first" => form.admin_first_name = v,
            "last" => form.admin_last_name = v,
            "email" => form.admin_email = v,
            "password" => form.admin_password = v,
            other => return Err(usage(format!("unknown field '{}'", other), REGISTER_ONG_USAGE)),
        }
    }
    Ok(form)
}

const VOLUNTEERS_USAGE: &str = "volunteers [tag|all] [page]";

// A lone number is a page, anything else a tag. Pages are 1-based on the
// command line.
fn parse_volunteers(args: &[String]) -> Result<Command, UsageError> {
    let page = |s: &str| {
        s.parse::<u32>()
            .ok()
            .filter(|p| *p > 0)
            .map(|p| p - 1)
            .ok_or_else(|| usage(format!("invalid page '{}'", s), VOLUNTEERS_USAGE))
    };
    match args {
        [] => Ok(Command::Volunteers { tag: None, page: None }),
        [one] if one.chars().all(|c| c.is_ascii_digit()) => Ok(Command::Volunteers { tag: None, page: Some(page(one)?) }),
        [tag] => Ok(Command::Volunteers { tag: Some(tag.clone()), page: None }),
        [tag, p] => Ok(Command::Volunteers { tag: Some(tag.clone()), page: Some(page(p)?) }),
        _ => Err(usage("too many arguments", VOLUNTEERS_USAGE)),
    }
}

fn group_arg(args: &[String], u: &'static str) -> Result<i64, UsageError> {
    match args {
        [g] => g.parse().map_err(|_| usage(format!("invalid group id '{}'", g), u)),
        _ => Err(usage("expected a group id", u)),
    }
}

fn group_page_args(args: &[String], u: &'static str) -> Result<(i64, u32), UsageError> {
    match args {
        [g] => Ok((group_arg(std::slice::from_ref(g), u)?, 0)),
        [g, p] => {
            let group = group_arg(std::slice::from_ref(g), u)?;
            let page = p
                .parse::<u32>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| usage(format!("invalid page '{}'", p), u))?;
            Ok((group, page - 1))
        }
        _ => Err(usage("expected a group id and an optional page", u)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command { parse_command(line).unwrap().unwrap() }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn tokenizer_keeps_quoted_values() {
        assert_eq!(tokenize(r#"register-ong org="ONG Amor e Vida" cnpj=1"#).unwrap(), vec!["register-ong", "org=ONG Amor e Vida", "cnpj=1"]);
        assert_eq!(tokenize(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
        assert!(tokenize(r#"open "/login"#).is_err());
    }

    #[test]
    fn login_and_simple_commands() {
        assert_eq!(parse("login a@b.com secret1"), Command::Login { email: "a@b.com".into(), password: "secret1".into() });
        assert!(parse_command("login a@b.com").is_err());
        assert_eq!(parse("WHOAMI"), Command::WhoAmI);
        assert_eq!(parse("open /ong/volunteers"), Command::Open("/ong/volunteers".into()));
        assert_eq!(parse("exit"), Command::Quit);
        let err = parse_command("frobnicate").unwrap_err();
        assert!(err.to_string().contains("unknown command 'frobnicate'"));
    }

    #[test]
    fn register_fields() {
        let Command::Register(form) = parse(r#"register ana@x.org secret1 volunteer first=Ana last="de Souza""#) else {
            panic!("expected register");
        };
        assert_eq!(form.role, "VOLUNTEER");
        assert_eq!(form.last_name.as_deref(), Some("de Souza"));
        assert!(parse_command("register a@b.com secret1 USER nickname=x").is_err());
        assert!(parse_command("register a@b.com secret1 USER first").is_err());
    }

    #[test]
    fn register_ong_fields() {
        let Command::RegisterOng(form) =
            parse("register-ong org=Vida cnpj=12345678000199 first=Jo last=Silva email=jo@vida.org password=secret1")
        else {
            panic!("expected register-ong");
        };
        assert_eq!(form.organization_name, "Vida");
        assert_eq!(form.admin_password, "secret1");
    }

    #[test]
    fn volunteers_arguments() {
        assert_eq!(parse("volunteers"), Command::Volunteers { tag: None, page: None });
        assert_eq!(parse("volunteers 2"), Command::Volunteers { tag: None, page: Some(1) });
        assert_eq!(parse("volunteers cooking"), Command::Volunteers { tag: Some("cooking".into()), page: None });
        assert_eq!(parse(r#"volunteers "first aid" 3"#), Command::Volunteers { tag: Some("first aid".into()), page: Some(2) });
        assert!(parse_command("volunteers cooking 0").is_err());
    }

    #[test]
    fn group_commands() {
        assert_eq!(parse("stats 7"), Command::Stats(7));
        assert_eq!(parse("projects 7"), Command::Projects { group: 7, page: 0 });
        assert_eq!(parse("donations 7 2"), Command::Donations { group: 7, page: 1 });
        assert!(parse_command("stats seven").is_err());
        assert!(parse_command("projects").is_err());
    }

    #[test]
    fn profile_tag_edits() {
        assert_eq!(parse("profile"), Command::Profile);
        assert_eq!(parse(r#"profile tag add "first aid""#), Command::ProfileTag(TagEdit::Add("first aid".into())));
        assert_eq!(parse("profile tag remove music"), Command::ProfileTag(TagEdit::Remove("music".into())));
        assert!(parse_command("profile tag rename x").is_err());
    }
}
