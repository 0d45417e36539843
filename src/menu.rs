// src/menu.rs

use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::error::ManagerError;
use crate::manager::Manager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Install,
    Update,
    Uninstall,
    Status,
    Password,
    Start,
    Stop,
    Restart,
    Exit,
}

impl Choice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Choice::Install),
            "2" => Some(Choice::Update),
            "3" => Some(Choice::Uninstall),
            "4" => Some(Choice::Status),
            "5" => Some(Choice::Password),
            "6" => Some(Choice::Start),
            "7" => Some(Choice::Stop),
            "8" => Some(Choice::Restart),
            "0" => Some(Choice::Exit),
            _ => None,
        }
    }

    /// One-shot actions end the menu once they have run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Choice::Install | Choice::Update | Choice::Uninstall)
    }
}

const MENU: &str = "
alist manager
─────────────────────────────
  1. Install
  2. Update
  3. Uninstall
  4. Status
  5. Reset password
  6. Start
  7. Stop
  8. Restart
  0. Exit
─────────────────────────────";

/// Performs one menu choice, reading follow-up answers from `input`.
pub trait MenuActions {
    fn perform(
        &mut self,
        choice: Choice,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<(), ManagerError>;
}

pub struct Menu<R, W> {
    input: R,
    output: W,
    pause: Duration,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, pause: Duration) -> Self {
        Menu {
            input,
            output,
            pause,
        }
    }

    /// Loops until `0`, end of input, or a one-shot action has run.
    pub fn run(&mut self, actions: &mut dyn MenuActions) -> Result<(), ManagerError> {
        loop {
            writeln!(self.output, "{}", MENU)?;
            write!(self.output, "Choose [0-8]: ")?;
            self.output.flush()?;

            let Some(line) = read_line(&mut self.input)? else {
                return Ok(());
            };

            let Some(choice) = Choice::parse(&line) else {
                writeln!(self.output, "❌ Invalid choice: {}", line.trim())?;
                std::thread::sleep(self.pause);
                continue;
            };

            if choice == Choice::Exit {
                return Ok(());
            }

            let result = actions.perform(choice, &mut self.input, &mut self.output);
            if choice.is_terminal() {
                return result;
            }

            if let Err(e) = result {
                writeln!(self.output, "❌ {}", e)?;
            }
            std::thread::sleep(self.pause);
        }
    }
}

fn read_line(input: &mut dyn BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn prompt(input: &mut dyn BufRead, output: &mut dyn Write, question: &str) -> io::Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;
    Ok(read_line(input)?.unwrap_or_default())
}

pub fn confirm(input: &mut dyn BufRead, output: &mut dyn Write, question: &str) -> io::Result<bool> {
    let answer = prompt(input, output, &format!("{} [y/N]: ", question))?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

impl MenuActions for Manager {
    fn perform(
        &mut self,
        choice: Choice,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<(), ManagerError> {
        match choice {
            Choice::Install => {
                let default_dir = self.config().install.default_dir.clone();
                let answer = prompt(
                    input,
                    output,
                    &format!("Install path (Enter for {}): ", default_dir),
                )?;
                let path = answer.trim();
                self.install((!path.is_empty()).then_some(path))?;
                Ok(())
            }
            Choice::Update => {
                self.update()?;
                Ok(())
            }
            Choice::Uninstall => {
                if confirm(input, output, "Remove the service, install dir and all data?")? {
                    self.uninstall()
                } else {
                    writeln!(output, "Aborted.")?;
                    Ok(())
                }
            }
            Choice::Status => self.print_status(false),
            Choice::Password => {
                writeln!(output, "  1. Generate a random password")?;
                writeln!(output, "  2. Set a new password")?;
                writeln!(output, "  0. Back")?;
                match prompt(input, output, "Choose [0-2]: ")?.trim() {
                    "1" => self.random_password().map(|_| ()),
                    "2" => {
                        let password = prompt(input, output, "New password: ")?;
                        self.set_password(password.trim()).map(|_| ())
                    }
                    "0" => Ok(()),
                    other => {
                        writeln!(output, "❌ Invalid choice: {}", other)?;
                        Ok(())
                    }
                }
            }
            Choice::Start => self.start(),
            Choice::Stop => self.stop(),
            Choice::Restart => self.restart(),
            Choice::Exit => Ok(()),
        }
    }
}
